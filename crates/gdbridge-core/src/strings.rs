//! The engine's two string types.
//!
//! `String` and `StringName` are distinct engine values with their own
//! constructors and destructors. Both are created through the engine and
//! released back to it, usually by a [`Lifetime`] scope.

use crate::api::ExtensionApi;
use crate::convert::{FromSlot, IntoSlot, SLOT_WORDS, Slot};
use crate::error::ConversionError;
use crate::handle::{StringNamePtr, StringPtr, Word};
use crate::ownership::{Lifetime, Local, Ownable};
use crate::refcount::RefCountBridge;

/// An engine `String`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct GString(pub StringPtr);

impl GString {
    /// Create an engine string owned by `lifetime`.
    pub fn new_in<'lt>(lifetime: &'lt Lifetime, text: &str) -> Local<'lt, GString> {
        let ptr = lifetime.api().string_new(text);
        lifetime.adopt(GString(ptr))
    }

    /// Copy the contents out as UTF-8.
    pub fn to_rust(self, api: &dyn ExtensionApi) -> String {
        api.string_to_utf8(self.0)
    }
}

impl Ownable for GString {
    const KIND_NAME: &'static str = "String";

    fn to_words(self) -> [Word; SLOT_WORDS] {
        [self.0.word(), 0, 0]
    }

    fn from_words(words: [Word; SLOT_WORDS]) -> Self {
        GString(StringPtr::from_word(words[0]))
    }

    fn release(self, bridge: &RefCountBridge) {
        bridge.api().string_destroy(self.0);
    }
}

impl IntoSlot for GString {
    fn into_slot(self) -> Slot {
        self.0.into_slot()
    }
}

impl FromSlot for GString {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        StringPtr::from_slot(slot).map(GString)
    }
}

/// An engine `StringName`: an interned, cheaply compared identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct StringName(pub StringNamePtr);

impl StringName {
    pub fn new_in<'lt>(lifetime: &'lt Lifetime, text: &str) -> Local<'lt, StringName> {
        let ptr = lifetime.api().string_name_new(text);
        lifetime.adopt(StringName(ptr))
    }

    pub fn to_rust(self, api: &dyn ExtensionApi) -> String {
        api.string_name_to_utf8(self.0)
    }
}

impl Ownable for StringName {
    const KIND_NAME: &'static str = "StringName";

    fn to_words(self) -> [Word; SLOT_WORDS] {
        [self.0.word(), 0, 0]
    }

    fn from_words(words: [Word; SLOT_WORDS]) -> Self {
        StringName(StringNamePtr::from_word(words[0]))
    }

    fn release(self, bridge: &RefCountBridge) {
        bridge.api().string_name_destroy(self.0);
    }
}

impl IntoSlot for StringName {
    fn into_slot(self) -> Slot {
        self.0.into_slot()
    }
}

impl FromSlot for StringName {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        StringNamePtr::from_slot(slot).map(StringName)
    }
}

//! `ConfigFile`: sectioned key/value storage with a text format.

use gdbridge_core::{
    BridgeError, CallFrame, ErrorCode, GString, GodotClass, MethodFlags, Transferred, Variant,
};

use super::ConfigFile;
use crate::method_bind::MethodBindDescriptor;
use crate::runtime::Runtime;

pub const SET_VALUE: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "set_value", 2504492430, 3);
pub const GET_VALUE: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "get_value", 89809366, 3)
        .with_flags(MethodFlags::CONST);
pub const HAS_SECTION: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "has_section", 3927539163, 1)
        .with_flags(MethodFlags::CONST);
pub const HAS_SECTION_KEY: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "has_section_key", 820780508, 2)
        .with_flags(MethodFlags::CONST);
pub const SAVE: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "save", 166001499, 1);
pub const LOAD: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "load", 166001499, 1);
pub const PARSE: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "parse", 166001499, 1);
pub const CLEAR: MethodBindDescriptor =
    MethodBindDescriptor::new("ConfigFile", "clear", 3218959716, 0);

impl ConfigFile {
    pub fn new(rt: &Runtime) -> Result<Transferred<ConfigFile>, BridgeError> {
        rt.construct::<ConfigFile>()
    }

    /// Store `value`. A nil value erases the key.
    pub fn set_value(
        self,
        rt: &Runtime,
        section: &str,
        key: &str,
        value: Variant,
    ) -> Result<(), BridgeError> {
        rt.scope(|lt| {
            let section = GString::new_in(lt, section);
            let key = GString::new_in(lt, key);
            let mut frame = CallFrame::<3>::new();
            frame.arg(section.get()).arg(key.get()).arg(value);
            rt.call(&SET_VALUE, self.object_ptr(), frame)
        })
    }

    /// The stored value, or `default` when the key is missing. The returned
    /// variant is a fresh copy owned by the caller.
    pub fn get_value(
        self,
        rt: &Runtime,
        section: &str,
        key: &str,
        default: Variant,
    ) -> Result<Transferred<Variant>, BridgeError> {
        rt.scope(|lt| {
            let section = GString::new_in(lt, section);
            let key = GString::new_in(lt, key);
            let mut frame = CallFrame::<3>::new();
            frame.arg(section.get()).arg(key.get()).arg(default);
            let value: Variant = rt.call(&GET_VALUE, self.object_ptr(), frame)?;
            Ok(Transferred::new(value))
        })
    }

    pub fn has_section(self, rt: &Runtime, section: &str) -> Result<bool, BridgeError> {
        rt.scope(|lt| {
            let section = GString::new_in(lt, section);
            let mut frame = CallFrame::<1>::new();
            frame.arg(section.get());
            rt.call(&HAS_SECTION, self.object_ptr(), frame)
        })
    }

    pub fn has_section_key(
        self,
        rt: &Runtime,
        section: &str,
        key: &str,
    ) -> Result<bool, BridgeError> {
        rt.scope(|lt| {
            let section = GString::new_in(lt, section);
            let key = GString::new_in(lt, key);
            let mut frame = CallFrame::<2>::new();
            frame.arg(section.get()).arg(key.get());
            rt.call(&HAS_SECTION_KEY, self.object_ptr(), frame)
        })
    }

    /// Write the contents to `path`.
    pub fn save(self, rt: &Runtime, path: &str) -> Result<ErrorCode, BridgeError> {
        self.with_text(rt, &SAVE, path)
    }

    /// Replace the contents with the file at `path`.
    pub fn load(self, rt: &Runtime, path: &str) -> Result<ErrorCode, BridgeError> {
        self.with_text(rt, &LOAD, path)
    }

    /// Replace the contents with `text`.
    pub fn parse(self, rt: &Runtime, text: &str) -> Result<ErrorCode, BridgeError> {
        self.with_text(rt, &PARSE, text)
    }

    pub fn clear(self, rt: &Runtime) -> Result<(), BridgeError> {
        rt.call(&CLEAR, self.object_ptr(), CallFrame::<0>::new())
    }

    fn with_text(
        self,
        rt: &Runtime,
        descriptor: &MethodBindDescriptor,
        text: &str,
    ) -> Result<ErrorCode, BridgeError> {
        rt.scope(|lt| {
            let text = GString::new_in(lt, text);
            let mut frame = CallFrame::<1>::new();
            frame.arg(text.get());
            rt.call(descriptor, self.object_ptr(), frame)
        })
    }
}

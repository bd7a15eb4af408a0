//! Ownership tags for engine handles.
//!
//! A raw [`Handle`](crate::handle::Handle) says nothing about who must release
//! the engine value behind it. The tags here do:
//!
//! | Tag | Released by | Shape |
//! |---|---|---|
//! | [`Local`] | its [`Lifetime`] scope, or explicitly via `end` | borrows the scope, non-`Copy` |
//! | [`Shared`] | the last clone to drop (engine refcount) | `Clone` |
//! | [`Root`] | nobody | `Copy` |
//! | [`Transferred`] | whoever it is converted into | consumed exactly once |
//!
//! Misuse that the type system can see is a compile error. Ending a tag
//! twice does not compile:
//!
//! ```compile_fail
//! use gdbridge_core::ownership::Lifetime;
//! use gdbridge_core::strings::GString;
//!
//! fn twice(lt: &Lifetime) {
//!     let s = GString::new_in(lt, "x");
//!     let _a = s.end();
//!     let _b = s.end();
//! }
//! ```
//!
//! Nor does letting a scoped tag outlive its scope:
//!
//! ```compile_fail
//! use gdbridge_core::ownership::{Lifetime, Local};
//! use gdbridge_core::refcount::RefCountBridge;
//! use gdbridge_core::strings::GString;
//! use std::sync::Arc;
//!
//! fn escape(bridge: Arc<RefCountBridge>) -> Local<'static, GString> {
//!     let lt = Lifetime::new(bridge);
//!     GString::new_in(&lt, "x")
//! }
//! ```
//!
//! Misuse only visible at run time (id-based access after `end`, adopting into
//! a closed scope, releasing a refcount twice) panics.

mod lifetime;
mod tags;

pub use lifetime::{Lifetime, Local, TagId};
pub use tags::{Root, Shared, Transferred};

use crate::convert::SLOT_WORDS;
use crate::handle::{ObjectPtr, Word};
use crate::refcount::RefCountBridge;

/// A kind of engine value that an ownership tag can hold.
///
/// Implementors say how the value is stored in a scope entry and what it
/// takes to acquire and release it.
pub trait Ownable: Copy + std::fmt::Debug + 'static {
    /// Name used in diagnostics.
    const KIND_NAME: &'static str;

    fn to_words(self) -> [Word; SLOT_WORDS];
    fn from_words(words: [Word; SLOT_WORDS]) -> Self;

    /// Called when the host starts owning a value fresh from the engine.
    fn acquire(self, _bridge: &RefCountBridge) {}

    /// The host's hold on the value is being handed over to the engine.
    /// Reference-counted kinds stop tracking the reference here.
    fn disown(self, _bridge: &RefCountBridge) {}

    /// The host takes back a hold it had disowned but not yet handed over.
    fn reclaim(self, _bridge: &RefCountBridge) {}

    /// Give the value back to the engine.
    fn release(self, bridge: &RefCountBridge);
}

/// An [`Ownable`] engine object whose lifetime is governed by the engine's
/// reference count.
pub trait RefCountedKind: Ownable {
    fn object_ptr(self) -> ObjectPtr;
}

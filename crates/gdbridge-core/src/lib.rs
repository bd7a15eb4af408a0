//! Core types for the engine binding layer.
//!
//! This crate holds everything that does not depend on the class registry or
//! a concrete engine:
//!
//! - [`handle`]: raw engine handles
//! - [`convert`]: slot storage and host value conversions
//! - [`callframe`]: argument/return marshaling for native calls
//! - [`ownership`]: ownership tags and arena scopes
//! - [`refcount`]: the reference-count bridge
//! - [`api`]: the engine ABI as a trait
//! - [`class`]: typed class views and the inheritance relation

pub mod api;
pub mod callframe;
pub mod class;
pub mod convert;
pub mod error;
pub mod error_code;
pub mod handle;
pub mod ownership;
pub mod refcount;
pub mod strings;
pub mod sys;
pub mod variant;

#[cfg(test)]
mod testing;

pub use api::{
    ClassCreationInfo, ClassFlags, ExtensionApi, ExtensionClassCallbacks, MethodFlags,
    VirtualCall,
};
pub use callframe::{ArgFrame, CallFrame, Ret};
pub use class::{GodotClass, Inherits};
pub use convert::{FromSlot, IntoSlot, SLOT_WORDS, Slot};
pub use error::{BridgeError, ConversionError, DispatchError, RegistrationError};
pub use error_code::ErrorCode;
pub use handle::{
    Handle, InstanceHandle, InstanceId, MethodBind, ObjectPtr, StringNamePtr, StringPtr,
    VariantPtr, Word,
};
pub use ownership::{Lifetime, Local, Ownable, RefCountedKind, Root, Shared, TagId, Transferred};
pub use refcount::RefCountBridge;
pub use strings::{GString, StringName};
pub use variant::{Variant, VariantType};

//! The engine extension ABI, as seen from the host.
//!
//! [`ExtensionApi`] is the complete set of native entry points the binding
//! core relies on. Backends implement it over a real engine interface table or,
//! for headless use, entirely in process.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::convert::Slot;
use crate::error::DispatchError;
use crate::handle::{
    InstanceHandle, InstanceId, MethodBind, ObjectPtr, StringNamePtr, StringPtr, VariantPtr,
};

bitflags! {
    /// Properties of a class known to the registry and the engine.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u32 {
        /// Can be extended but has virtual-only behavior.
        const VIRTUAL = 1 << 0;
        /// Cannot be constructed.
        const ABSTRACT = 1 << 1;
        /// Visible to the editor and scripts.
        const EXPOSED = 1 << 2;
        /// Instances are reference counted.
        const REF_COUNTED = 1 << 3;
        /// Accessed through the engine's singleton table.
        const SINGLETON = 1 << 4;
        /// Defined by the host rather than the engine.
        const EXTENSION = 1 << 5;
    }
}

bitflags! {
    /// Method bind properties.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MethodFlags: u32 {
        const NORMAL = 1 << 0;
        const EDITOR = 1 << 1;
        const CONST = 1 << 2;
        const VIRTUAL = 1 << 3;
        const VARARG = 1 << 4;
        const STATIC = 1 << 5;
    }
}

/// A resolved virtual override the engine can invoke on an instance.
pub type VirtualCall =
    Arc<dyn Fn(InstanceHandle, &[Slot], &mut Slot) -> Result<(), DispatchError> + Send + Sync>;

/// Callbacks the engine uses to manage instances of a host-defined class.
pub trait ExtensionClassCallbacks: Send + Sync {
    /// Create the native object and its host instance, returning the object.
    fn create_instance(&self) -> ObjectPtr;

    /// The engine is destroying the object bound to `instance`.
    fn free_instance(&self, instance: InstanceHandle);

    /// Resolve a virtual method by name.
    ///
    /// `Ok(None)` means the engine's default implementation applies.
    fn get_virtual(&self, name: &str) -> Result<Option<VirtualCall>, DispatchError>;
}

/// Registration payload for a host-defined class.
#[derive(Clone)]
pub struct ClassCreationInfo {
    pub flags: ClassFlags,
    pub callbacks: Arc<dyn ExtensionClassCallbacks>,
}

impl fmt::Debug for ClassCreationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassCreationInfo")
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Native entry points of the engine.
///
/// Handles returned by the constructors here (`string_new`, `string_name_new`,
/// `variant_from_string`, `classdb_construct_object`, `object_get_class_name`)
/// are owned by the caller.
pub trait ExtensionApi: Send + Sync {
    // ------------------------------------------------------------------------
    // Strings
    // ------------------------------------------------------------------------

    fn string_new(&self, text: &str) -> StringPtr;
    fn string_to_utf8(&self, string: StringPtr) -> String;
    fn string_destroy(&self, string: StringPtr);

    fn string_name_new(&self, text: &str) -> StringNamePtr;
    fn string_name_to_utf8(&self, name: StringNamePtr) -> String;
    fn string_name_destroy(&self, name: StringNamePtr);

    // ------------------------------------------------------------------------
    // Variants
    // ------------------------------------------------------------------------

    /// Build a `String` variant holding a copy of `string`.
    fn variant_from_string(&self, string: StringPtr) -> VariantPtr;
    /// Stringify a variant into a new `String`.
    fn variant_to_string(&self, variant: VariantPtr) -> StringPtr;
    fn variant_destroy(&self, variant: VariantPtr);

    // ------------------------------------------------------------------------
    // Objects
    // ------------------------------------------------------------------------

    /// Construct an instance of `class`; null if the class cannot be built.
    fn classdb_construct_object(&self, class: StringNamePtr) -> ObjectPtr;

    /// Look up a method bind; null if no method matches name and hash.
    fn classdb_get_method_bind(
        &self,
        class: StringNamePtr,
        method: StringNamePtr,
        hash: i64,
    ) -> MethodBind;

    /// Invoke a method bind with pointer-call semantics.
    fn object_method_bind_ptrcall(
        &self,
        bind: MethodBind,
        receiver: ObjectPtr,
        args: &[Slot],
        ret: &mut Slot,
    );

    fn object_destroy(&self, object: ObjectPtr);
    fn object_get_instance_id(&self, object: ObjectPtr) -> InstanceId;
    fn object_get_instance_from_id(&self, id: InstanceId) -> ObjectPtr;
    fn object_get_class_name(&self, object: ObjectPtr) -> StringNamePtr;

    /// Bind host instance data to a native object of a host-defined class.
    fn object_set_instance(
        &self,
        object: ObjectPtr,
        class: StringNamePtr,
        instance: InstanceHandle,
    );

    /// Null if no singleton has that name.
    fn global_get_singleton(&self, name: StringNamePtr) -> ObjectPtr;

    // ------------------------------------------------------------------------
    // Reference counting
    // ------------------------------------------------------------------------

    /// Whether the object's class derives from `RefCounted`.
    fn object_is_ref_counted(&self, object: ObjectPtr) -> bool;
    /// Increment; false if the object is not reference counted.
    fn ref_reference(&self, object: ObjectPtr) -> bool;
    /// Decrement; true when the count reached zero.
    fn ref_unreference(&self, object: ObjectPtr) -> bool;

    // ------------------------------------------------------------------------
    // Classes and diagnostics
    // ------------------------------------------------------------------------

    fn classdb_register_extension_class(
        &self,
        class: StringNamePtr,
        parent: StringNamePtr,
        info: ClassCreationInfo,
    );

    fn print_error(&self, message: &str, function: &str, file: &str, line: u32);
}

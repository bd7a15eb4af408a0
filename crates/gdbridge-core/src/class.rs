//! Typed views over engine objects.
//!
//! Every engine class is represented on the host by a `Copy` wrapper around
//! an [`ObjectPtr`]. The class hierarchy is expressed with [`Inherits`], so
//! upcasting is a checked trait bound rather than a pointer cast.

use crate::handle::ObjectPtr;
use crate::ownership::Ownable;

/// A host view of an engine class.
pub trait GodotClass: Ownable + Send + Sync {
    /// The engine's name for the class.
    const CLASS_NAME: &'static str;

    /// Direct superclass. `Object` names itself.
    type Base: GodotClass;

    /// Wrap a pointer without checking its dynamic class.
    fn from_object_ptr(ptr: ObjectPtr) -> Self;

    fn object_ptr(self) -> ObjectPtr;

    /// View the object as one of its ancestors.
    fn upcast<B>(self) -> B
    where
        Self: Inherits<B>,
        B: GodotClass,
    {
        B::from_object_ptr(self.object_ptr())
    }

    fn is_null(self) -> bool {
        self.object_ptr().is_null()
    }
}

/// `Self` is `B` or a subclass of `B`.
pub trait Inherits<B: GodotClass>: GodotClass {}

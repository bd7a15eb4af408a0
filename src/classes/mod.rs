//! Typed views of the engine classes the binding layer knows about.
//!
//! Each class is a `Copy` newtype over [`ObjectPtr`]. Manually managed
//! classes are destroyed when their owning tag releases them; reference
//! counted classes go through the [`RefCountBridge`]. `Object` may hold
//! either, so its tags ask the engine which rule applies.

use gdbridge_core::{
    ClassFlags, ConversionError, FromSlot, GodotClass, Inherits, IntoSlot, ObjectPtr, Ownable,
    RefCountBridge, RefCountedKind, RegistrationError, SLOT_WORDS, Slot, Word,
};
use gdbridge_registry::{ClassEntry, ClassRegistry};

pub mod config_file;
pub mod engine;
pub mod file_access;
pub mod node;
pub mod object;
pub mod ref_counted;

macro_rules! engine_class {
    (@ownable $name:ident, manual) => {
        impl Ownable for $name {
            const KIND_NAME: &'static str = stringify!($name);

            fn to_words(self) -> [Word; SLOT_WORDS] {
                [self.0.word(), 0, 0]
            }

            fn from_words(words: [Word; SLOT_WORDS]) -> Self {
                Self(ObjectPtr::from_word(words[0]))
            }

            fn release(self, bridge: &RefCountBridge) {
                bridge.api().object_destroy(self.0);
            }
        }
    };
    (@ownable $name:ident, by_object) => {
        impl Ownable for $name {
            const KIND_NAME: &'static str = stringify!($name);

            fn to_words(self) -> [Word; SLOT_WORDS] {
                [self.0.word(), 0, 0]
            }

            fn from_words(words: [Word; SLOT_WORDS]) -> Self {
                Self(ObjectPtr::from_word(words[0]))
            }

            fn acquire(self, bridge: &RefCountBridge) {
                bridge.acquire_object(self.0);
            }

            fn disown(self, bridge: &RefCountBridge) {
                if bridge.api().object_is_ref_counted(self.0) {
                    bridge.forget(self.0);
                }
            }

            fn reclaim(self, bridge: &RefCountBridge) {
                if bridge.api().object_is_ref_counted(self.0) {
                    bridge.reclaim(self.0);
                }
            }

            fn release(self, bridge: &RefCountBridge) {
                bridge.release_object(self.0);
            }
        }
    };
    (@ownable $name:ident, ref_counted) => {
        impl Ownable for $name {
            const KIND_NAME: &'static str = stringify!($name);

            fn to_words(self) -> [Word; SLOT_WORDS] {
                [self.0.word(), 0, 0]
            }

            fn from_words(words: [Word; SLOT_WORDS]) -> Self {
                Self(ObjectPtr::from_word(words[0]))
            }

            fn acquire(self, bridge: &RefCountBridge) {
                bridge.reference(self.0);
            }

            fn disown(self, bridge: &RefCountBridge) {
                bridge.forget(self.0);
            }

            fn reclaim(self, bridge: &RefCountBridge) {
                bridge.reclaim(self.0);
            }

            fn release(self, bridge: &RefCountBridge) {
                bridge.release(self.0);
            }
        }

        impl RefCountedKind for $name {
            fn object_ptr(self) -> ObjectPtr {
                self.0
            }
        }
    };
    ($(#[$meta:meta])* $name:ident : $base:ident [$($ancestor:ident),*] $kind:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(ObjectPtr);

        impl GodotClass for $name {
            const CLASS_NAME: &'static str = stringify!($name);
            type Base = $base;

            fn from_object_ptr(ptr: ObjectPtr) -> Self {
                Self(ptr)
            }

            fn object_ptr(self) -> ObjectPtr {
                self.0
            }
        }

        engine_class!(@ownable $name, $kind);

        impl Inherits<$name> for $name {}
        $(impl Inherits<$ancestor> for $name {})*

        impl IntoSlot for $name {
            fn into_slot(self) -> Slot {
                self.0.into_slot()
            }
        }

        impl FromSlot for $name {
            fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
                ObjectPtr::from_slot(slot).map(Self)
            }
        }
    };
}

engine_class!(
    /// Root of the class hierarchy. Released by the rule of the object's
    /// actual class.
    Object: Object [] by_object
);
engine_class!(
    /// Base of every reference-counted class.
    RefCounted: Object [Object] ref_counted
);
engine_class!(
    /// Scene tree node. Owned by its parent once added to a tree.
    Node: Object [Object] manual
);
engine_class!(ConfigFile: RefCounted [RefCounted, Object] ref_counted);
engine_class!(FileAccess: RefCounted [RefCounted, Object] ref_counted);
engine_class!(
    /// Process-wide engine singleton.
    Engine: Object [Object] manual
);

/// Add the engine classes, with the virtuals each declares, to `registry`.
pub fn register_engine_classes(registry: &mut ClassRegistry) -> Result<(), RegistrationError> {
    let entries = [
        ClassEntry::engine(Object::CLASS_NAME, None).declare::<object::Notification>(),
        ClassEntry::engine(RefCounted::CLASS_NAME, Some(Object::CLASS_NAME))
            .with_flags(ClassFlags::REF_COUNTED),
        ClassEntry::engine(Node::CLASS_NAME, Some(Object::CLASS_NAME))
            .declare::<node::Ready>()
            .declare::<node::Process>()
            .declare::<node::PhysicsProcess>()
            .declare::<node::EnterTree>()
            .declare::<node::ExitTree>(),
        ClassEntry::engine(ConfigFile::CLASS_NAME, Some(RefCounted::CLASS_NAME))
            .with_flags(ClassFlags::REF_COUNTED),
        ClassEntry::engine(FileAccess::CLASS_NAME, Some(RefCounted::CLASS_NAME))
            .with_flags(ClassFlags::REF_COUNTED | ClassFlags::ABSTRACT),
        ClassEntry::engine(Engine::CLASS_NAME, Some(Object::CLASS_NAME))
            .with_flags(ClassFlags::SINGLETON),
    ];
    for entry in entries {
        registry.register(entry)?;
    }
    Ok(())
}

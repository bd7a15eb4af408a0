//! Typed builder for host-defined classes.
//!
//! ```ignore
//! let player = ExtensionClass::<Player, Node>::new("Player", |base| Player::new(base))
//!     .override_virtual::<node::Process, _>(|this, (delta,)| this.tick(delta))
//!     .into_entry();
//! ```
//!
//! Overriding a virtual the base class does not inherit is rejected at
//! compile time through the `B: Inherits<M::Owner>` bound.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use gdbridge_core::{ClassFlags, GodotClass, Inherits};

use crate::entry::{ClassEntry, InstanceFactory};
use crate::virtuals::{VirtualMethod, VirtualSlot, VirtualTable, erase_override};

/// A host class `T` extending the engine class `B`.
pub struct ExtensionClass<T, B> {
    name: String,
    factory: InstanceFactory,
    flags: ClassFlags,
    virtuals: VirtualTable,
    _marker: PhantomData<fn() -> (T, B)>,
}

impl<T, B> ExtensionClass<T, B>
where
    T: Any + Send,
    B: GodotClass,
{
    /// `init` receives the freshly constructed native base object.
    pub fn new(name: impl Into<String>, init: impl Fn(B) -> T + Send + Sync + 'static) -> Self {
        let factory: InstanceFactory = Arc::new(move |ptr| {
            let instance: Box<dyn Any + Send> = Box::new(init(B::from_object_ptr(ptr)));
            instance
        });
        Self {
            name: name.into(),
            factory,
            flags: ClassFlags::empty(),
            virtuals: VirtualTable::new(),
            _marker: PhantomData,
        }
    }

    /// Replace the engine's implementation of virtual `M`.
    pub fn override_virtual<M, F>(mut self, f: F) -> Self
    where
        M: VirtualMethod,
        B: Inherits<M::Owner>,
        F: Fn(&mut T, M::Args) -> M::Ret + Send + Sync + 'static,
    {
        self.virtuals.set_override(M::NAME, erase_override::<T, M, F>(f));
        self
    }

    pub fn flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_entry(self) -> ClassEntry {
        let mut entry = ClassEntry::extension(self.name, B::CLASS_NAME, self.factory);
        if !self.flags.is_empty() {
            entry = entry.with_flags(self.flags);
        }
        for name in self.virtuals.names() {
            if let Some(VirtualSlot::Override(f)) = self.virtuals.get(name) {
                entry = entry.with_override(name, f.clone());
            }
        }
        entry
    }
}

impl<T, B> From<ExtensionClass<T, B>> for ClassEntry
where
    T: Any + Send,
    B: GodotClass,
{
    fn from(class: ExtensionClass<T, B>) -> Self {
        class.into_entry()
    }
}

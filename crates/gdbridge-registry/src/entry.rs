//! Class registry entries.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use gdbridge_core::{ClassFlags, ObjectPtr};

use crate::virtuals::{VirtualFn, VirtualMethod, VirtualTable};

/// Builds the host instance for a freshly constructed native object.
pub type InstanceFactory = Arc<dyn Fn(ObjectPtr) -> Box<dyn Any + Send> + Send + Sync>;

/// How instances of a class come into existence.
#[derive(Clone)]
pub enum ClassConstructor {
    /// The engine constructs it by name.
    Native,
    /// The engine constructs the native base; the host adds its instance.
    Extension(InstanceFactory),
    /// Abstract classes and singletons.
    None,
}

impl fmt::Debug for ClassConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassConstructor::Native => write!(f, "Native"),
            ClassConstructor::Extension(_) => write!(f, "Extension(..)"),
            ClassConstructor::None => write!(f, "None"),
        }
    }
}

/// A registered class.
#[derive(Clone, Debug)]
pub struct ClassEntry {
    name: String,
    parent: Option<String>,
    flags: ClassFlags,
    constructor: ClassConstructor,
    virtuals: VirtualTable,
}

impl ClassEntry {
    /// An engine class, constructed natively.
    pub fn engine(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_owned),
            flags: ClassFlags::EXPOSED,
            constructor: ClassConstructor::Native,
            virtuals: VirtualTable::new(),
        }
    }

    /// A host-defined class with an instance factory.
    pub fn extension(name: impl Into<String>, parent: &str, factory: InstanceFactory) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.to_owned()),
            flags: ClassFlags::EXPOSED | ClassFlags::EXTENSION,
            constructor: ClassConstructor::Extension(factory),
            virtuals: VirtualTable::new(),
        }
    }

    pub fn with_flags(mut self, flags: ClassFlags) -> Self {
        self.flags |= flags;
        if flags.intersects(ClassFlags::ABSTRACT | ClassFlags::SINGLETON) {
            self.constructor = ClassConstructor::None;
        }
        self
    }

    /// Declare a virtual the engine implements by default.
    pub fn declare<M: VirtualMethod>(mut self) -> Self {
        self.virtuals.declare(M::NAME);
        self
    }

    /// Declare a virtual by name only.
    pub fn declare_name(mut self, name: &'static str) -> Self {
        self.virtuals.declare(name);
        self
    }

    pub fn with_override(mut self, name: &'static str, f: VirtualFn) -> Self {
        self.virtuals.set_override(name, f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn flags(&self) -> ClassFlags {
        self.flags
    }

    pub fn constructor(&self) -> &ClassConstructor {
        &self.constructor
    }

    pub fn virtuals(&self) -> &VirtualTable {
        &self.virtuals
    }

    pub fn is_extension(&self) -> bool {
        self.flags.contains(ClassFlags::EXTENSION)
    }

    pub fn is_ref_counted(&self) -> bool {
        self.flags.contains(ClassFlags::REF_COUNTED)
    }
}

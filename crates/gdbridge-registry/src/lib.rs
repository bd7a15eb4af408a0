//! Class registry and virtual dispatch.
//!
//! - [`ClassRegistry`]: name-keyed class table with an inheritance graph
//! - [`VirtualMethod`]: type-level description of an engine virtual
//! - [`ExtensionClass`]: typed builder for host classes overriding virtuals

pub mod entry;
pub mod extension;
pub mod registry;
pub mod virtuals;

pub use entry::{ClassConstructor, ClassEntry, InstanceFactory};
pub use extension::ExtensionClass;
pub use registry::{ClassRegistry, Resolution};
pub use virtuals::{FromArgs, VirtualFn, VirtualMethod, VirtualSlot, VirtualTable, erase_override};

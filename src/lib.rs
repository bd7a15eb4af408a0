//! Host-side bindings for a scene-graph game engine's extension interface.
//!
//! The engine exposes its classes through method binds called with packed
//! argument slots, and lets host code define classes that extend engine
//! classes and override their virtual methods. This crate wraps that in:
//!
//! - [`Runtime`]: the context every boundary call goes through, holding the
//!   class registry, method bind cache and host instances
//! - [`classes`]: typed views of engine classes with glue for their methods
//! - ownership tags from [`gdbridge_core::ownership`], which make it explicit
//!   who releases each engine value
//!
//! ```ignore
//! let rt = Runtime::builder(engine).build()?;
//! let config = ConfigFile::new(&rt)?.cycle(rt.bridge());
//! config.get().set_value(&rt, "player", "name", name)?;
//! ```

mod callbacks;
pub mod classes;
pub mod config;
pub mod error;
pub mod instance;
pub mod method_bind;
pub mod runtime;

pub use config::{RuntimeConfig, RuntimeProperty};
pub use error::RuntimeError;
pub use instance::InstanceStorage;
pub use method_bind::{MethodBindCache, MethodBindDescriptor};
pub use runtime::{BoundVirtual, Runtime, RuntimeBuilder};

pub use gdbridge_core::{
    BridgeError, CallFrame, ConversionError, DispatchError, ErrorCode, ExtensionApi, GString,
    Lifetime, Local, ObjectPtr, RegistrationError, Root, Shared, StringName, Transferred, Variant,
};
pub use gdbridge_registry::{ExtensionClass, VirtualMethod};

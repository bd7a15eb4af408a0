//! The runtime context.
//!
//! A [`Runtime`] is created once at startup by a [`RuntimeBuilder`], which
//! registers the engine classes, then the host classes, validates the
//! hierarchy and announces every host class to the engine. There is no
//! global state: everything the binding layer needs hangs off the runtime.
//!
//! ```ignore
//! let rt = Runtime::builder(engine)
//!     .register_class(
//!         ExtensionClass::<Player, Node>::new("Player", Player::new)
//!             .override_virtual::<node::Process, _>(|p, (delta,)| p.tick(delta)),
//!     )
//!     .build()?;
//!
//! let player = rt.instantiate::<Node>("Player")?;
//! scene_root.add_child(&rt, player)?;
//! ```

use std::any::Any;
use std::sync::Arc;

use gdbridge_core::{
    BridgeError, CallFrame, ClassCreationInfo, ClassFlags, DispatchError, ExtensionApi, FromSlot,
    GodotClass, InstanceHandle, Lifetime, MethodBind, ObjectPtr, RefCountBridge, Root, Slot,
    StringName, Transferred,
};
use gdbridge_registry::{ClassEntry, ClassRegistry, Resolution, VirtualFn};

use crate::callbacks::{ExtensionCallbacks, RuntimeShared};
use crate::classes::{self, Object};
use crate::config::{RuntimeConfig, RuntimeProperty};
use crate::error::RuntimeError;
use crate::instance::InstanceStorage;
use crate::method_bind::{MethodBindCache, MethodBindDescriptor};

// ============================================================================
// Builder
// ============================================================================

/// Collects configuration and host classes before startup.
pub struct RuntimeBuilder {
    api: Arc<dyn ExtensionApi>,
    config: RuntimeConfig,
    classes: Vec<ClassEntry>,
}

impl RuntimeBuilder {
    pub fn new(api: Arc<dyn ExtensionApi>) -> Self {
        Self {
            api,
            config: RuntimeConfig::new(),
            classes: Vec::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn property(mut self, property: RuntimeProperty, value: usize) -> Self {
        self.config.set(property, value);
        self
    }

    /// Add a host class. Registering a name twice keeps the later class.
    pub fn register_class(mut self, class: impl Into<ClassEntry>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Build the class registry and register host classes with the engine.
    ///
    /// # Errors
    ///
    /// Fails if a host class reuses an engine class name, extends an unknown
    /// class, or is part of an inheritance cycle.
    pub fn build(self) -> Result<Runtime, RuntimeError> {
        let RuntimeBuilder {
            api,
            config,
            classes: host_classes,
        } = self;

        let mut registry = ClassRegistry::new();
        classes::register_engine_classes(&mut registry)?;
        for entry in host_classes {
            let name = entry.name().to_owned();
            if registry.get(&name).is_some_and(|e| !e.is_extension()) {
                return Err(RuntimeError::ShadowsEngineClass(name));
            }
            let replaced = registry.register(entry)?;
            if replaced.is_some() && config.is_enabled(RuntimeProperty::WarnOnReregister) {
                tracing::warn!(
                    class = %name,
                    "host class registered twice, the later registration wins"
                );
            }
        }
        registry.validate()?;

        let bridge = Arc::new(RefCountBridge::new(
            api.clone(),
            config.is_enabled(RuntimeProperty::RefLedger),
        ));
        let shared = Arc::new(RuntimeShared {
            bridge,
            registry,
            instances: Arc::new(InstanceStorage::new()),
        });

        // Parents before children so the engine always knows the base.
        let mut extensions = shared.registry.extensions();
        extensions.sort_by_key(|entry| shared.registry.ancestors(entry.name()).len());
        for entry in extensions {
            let callbacks = Arc::new(ExtensionCallbacks::new(
                entry.name(),
                Arc::downgrade(&shared),
            ));
            let parent = entry.parent().unwrap_or(Object::CLASS_NAME);
            Lifetime::scope(shared.bridge.clone(), |lt| {
                let class = StringName::new_in(lt, entry.name());
                let parent = StringName::new_in(lt, parent);
                api.classdb_register_extension_class(
                    class.get().0,
                    parent.get().0,
                    ClassCreationInfo {
                        flags: entry.flags() | ClassFlags::EXTENSION,
                        callbacks,
                    },
                );
            });
            tracing::debug!(class = entry.name(), parent, "host class registered");
        }

        Ok(Runtime {
            api,
            shared,
            binds: MethodBindCache::new(),
            config,
        })
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Explicit context for every call across the engine boundary.
pub struct Runtime {
    api: Arc<dyn ExtensionApi>,
    shared: Arc<RuntimeShared>,
    binds: MethodBindCache,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn builder(api: Arc<dyn ExtensionApi>) -> RuntimeBuilder {
        RuntimeBuilder::new(api)
    }

    pub fn api(&self) -> &dyn ExtensionApi {
        self.api.as_ref()
    }

    pub fn bridge(&self) -> &Arc<RefCountBridge> {
        &self.shared.bridge
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.shared.registry
    }

    pub fn instances(&self) -> &InstanceStorage {
        &self.shared.instances
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// A fresh arena scope.
    pub fn lifetime(&self) -> Lifetime {
        Lifetime::new(self.bridge().clone())
    }

    /// Run `f` in an arena scope that closes when it returns.
    pub fn scope<R>(&self, f: impl FnOnce(&Lifetime) -> R) -> R {
        Lifetime::scope(self.bridge().clone(), f)
    }

    // ========================================================================
    // Method invocation
    // ========================================================================

    /// Resolve a method bind, asking the engine only on the first use.
    pub fn method_bind(
        &self,
        descriptor: &MethodBindDescriptor,
    ) -> Result<MethodBind, BridgeError> {
        if let Some(bind) = self.binds.get(descriptor) {
            return Ok(bind);
        }
        let bind = self.scope(|lt| {
            let class = StringName::new_in(lt, descriptor.class);
            let method = StringName::new_in(lt, descriptor.method);
            self.api
                .classdb_get_method_bind(class.get().0, method.get().0, descriptor.hash)
        });
        if bind.is_null() {
            tracing::error!(
                class = descriptor.class,
                method = descriptor.method,
                hash = descriptor.hash,
                "method bind not found"
            );
            return Err(BridgeError::MethodNotFound {
                class: descriptor.class,
                method: descriptor.method,
                hash: descriptor.hash,
            });
        }
        tracing::debug!(
            class = descriptor.class,
            method = descriptor.method,
            ?bind,
            "method bind resolved"
        );
        self.binds.insert(descriptor, bind);
        Ok(bind)
    }

    /// Invoke `descriptor` on `receiver` with the arguments in `frame`.
    ///
    /// The call is synchronous; on return the frame's return slot holds the
    /// result. Error codes in the return slot are not interpreted.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn ptrcall<const N: usize>(
        &self,
        descriptor: &MethodBindDescriptor,
        receiver: ObjectPtr,
        frame: &mut CallFrame<N>,
    ) -> Result<(), BridgeError> {
        if frame.len() != descriptor.argc {
            return Err(BridgeError::ArgumentCount {
                class: descriptor.class,
                method: descriptor.method,
                expected: descriptor.argc,
                actual: frame.len(),
            });
        }
        if receiver.is_null() && !descriptor.is_static() {
            return Err(BridgeError::NullReceiver {
                class: descriptor.class,
                method: descriptor.method,
            });
        }
        let bind = self.method_bind(descriptor)?;
        let (args, ret) = frame.begin_call();
        tracing::trace!(class = descriptor.class, method = descriptor.method, "ptrcall");
        self.api.object_method_bind_ptrcall(bind, receiver, args, ret);
        Ok(())
    }

    /// Call and decode the result as `T`, then free the frame.
    pub fn call<const N: usize, T: FromSlot>(
        &self,
        descriptor: &MethodBindDescriptor,
        receiver: ObjectPtr,
        mut frame: CallFrame<N>,
    ) -> Result<T, BridgeError> {
        let ret = frame.ret::<T>();
        self.ptrcall(descriptor, receiver, &mut frame)?;
        let value = frame.read(ret);
        frame.free();
        Ok(value?)
    }

    // ========================================================================
    // Objects
    // ========================================================================

    /// Construct an object by class name. The caller owns the result.
    pub fn construct_object(&self, class: &str) -> Result<Transferred<Object>, BridgeError> {
        let object = self.scope(|lt| {
            let name = StringName::new_in(lt, class);
            self.api.classdb_construct_object(name.get().0)
        });
        if object.is_null() {
            return Err(BridgeError::ConstructFailed {
                class: class.to_owned(),
            });
        }
        Ok(Transferred::new(Object::from_object_ptr(object)))
    }

    /// Construct an engine class.
    pub fn construct<T: GodotClass>(&self) -> Result<Transferred<T>, BridgeError> {
        Ok(self
            .construct_object(T::CLASS_NAME)?
            .map(|object| T::from_object_ptr(object.object_ptr())))
    }

    /// Construct a host class, viewed as its engine base `B`.
    pub fn instantiate<B: GodotClass>(&self, class: &str) -> Result<Transferred<B>, BridgeError> {
        let registry = self.registry();
        let Some(entry) = registry.get(class) else {
            return Err(DispatchError::UnregisteredClass {
                class: class.to_owned(),
            }
            .into());
        };
        if !entry.is_extension() || !registry.is_subclass(class, B::CLASS_NAME) {
            return Err(BridgeError::ConstructFailed {
                class: class.to_owned(),
            });
        }
        Ok(self
            .construct_object(class)?
            .map(|object| B::from_object_ptr(object.object_ptr())))
    }

    /// An engine singleton. Singletons are never released by the host.
    pub fn singleton<T: GodotClass>(&self) -> Result<Root<T>, BridgeError> {
        let object = self.scope(|lt| {
            let name = StringName::new_in(lt, T::CLASS_NAME);
            self.api.global_get_singleton(name.get().0)
        });
        if object.is_null() {
            return Err(BridgeError::SingletonNotFound {
                name: T::CLASS_NAME.to_owned(),
            });
        }
        Ok(Root::new(T::from_object_ptr(object)))
    }

    /// Dynamic class name of `object`.
    pub fn class_name(&self, object: ObjectPtr) -> String {
        self.scope(|lt| {
            let name = lt.adopt(StringName(self.api.object_get_class_name(object)));
            name.get().to_rust(self.api())
        })
    }

    /// Run `f` on the host instance bound to `object`.
    pub fn with_instance<T: Any, R>(
        &self,
        object: ObjectPtr,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, DispatchError> {
        let handle = self
            .instances()
            .handle_for(object)
            .ok_or(DispatchError::InstanceType {
                expected: std::any::type_name::<T>(),
            })?;
        self.instances().with(handle, f)
    }

    // ========================================================================
    // Virtual dispatch
    // ========================================================================

    /// Resolve virtual `name` on `object`.
    ///
    /// `Ok(None)` means the engine's own implementation runs. Names no class
    /// in the chain declares are an error, not a silent fallback.
    pub fn virtual_by_name(
        &self,
        object: ObjectPtr,
        name: &str,
    ) -> Result<Option<BoundVirtual>, DispatchError> {
        let handle = self.instances().handle_for(object);
        let class = match handle.and_then(|h| self.instances().class_of(h)) {
            Some(class) => class,
            None => self.class_name(object),
        };
        let resolution = self.registry().resolve_virtual(&class, name).inspect_err(|err| {
            tracing::error!(class = %class, method = name, %err, "unresolved virtual method");
        })?;
        match (resolution, handle) {
            (Resolution::Override { class, method }, Some(instance)) => Ok(Some(BoundVirtual {
                instance,
                class,
                method_name: name.to_owned(),
                call: method,
                instances: Arc::clone(&self.shared.instances),
            })),
            _ => Ok(None),
        }
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// References the host still holds, per object. Empty without a ledger.
    pub fn leaked_references(&self) -> Vec<(ObjectPtr, u32)> {
        self.bridge().outstanding()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        if !self.config.is_enabled(RuntimeProperty::LeakCheckOnShutdown) {
            return;
        }
        for (object, count) in self.leaked_references() {
            tracing::error!(?object, count, "host references still held at shutdown");
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("registry", self.registry())
            .field("instances", self.instances())
            .field("binds", &self.binds.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bound virtuals
// ============================================================================

/// A host override bound to one instance.
pub struct BoundVirtual {
    instance: InstanceHandle,
    class: String,
    method_name: String,
    call: VirtualFn,
    instances: Arc<InstanceStorage>,
}

impl BoundVirtual {
    /// The class that provided the override.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn method(&self) -> &str {
        &self.method_name
    }

    pub fn instance(&self) -> InstanceHandle {
        self.instance
    }

    /// Invoke with native arguments, writing the result to `ret`.
    pub fn call(&self, args: &[Slot], ret: &mut Slot) -> Result<(), DispatchError> {
        let call = &self.call;
        self.instances.with_instance(self.instance, |this| {
            call(this, gdbridge_core::ArgFrame::new(args), ret)
        })?
    }

    /// Invoke with the arguments of `frame`, completing the frame's call.
    pub fn call_frame<const N: usize>(
        &self,
        frame: &mut CallFrame<N>,
    ) -> Result<(), DispatchError> {
        let (args, ret) = frame.begin_call();
        self.call(args, ret)
    }
}

impl std::fmt::Debug for BoundVirtual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundVirtual")
            .field("instance", &self.instance)
            .field("class", &self.class)
            .field("method", &self.method_name)
            .finish_non_exhaustive()
    }
}

//! The engine's view of host classes.
//!
//! One [`ExtensionCallbacks`] is registered with the engine per host class.
//! It holds only a weak reference to the runtime: the engine keeps the
//! callbacks alive, and the runtime keeps the engine alive.

use std::sync::{Arc, Weak};

use gdbridge_core::{
    ArgFrame, BridgeError, DispatchError, ExtensionClassCallbacks, InstanceHandle, Lifetime,
    ObjectPtr, RefCountBridge, Slot, StringName, VirtualCall,
};
use gdbridge_registry::{ClassConstructor, ClassRegistry, Resolution};

use crate::instance::InstanceStorage;

/// State shared between a runtime and the callbacks it registered.
pub(crate) struct RuntimeShared {
    pub(crate) bridge: Arc<RefCountBridge>,
    pub(crate) registry: ClassRegistry,
    pub(crate) instances: Arc<InstanceStorage>,
}

impl RuntimeShared {
    /// The nearest engine class in the parent chain of `class`.
    pub(crate) fn native_base(&self, class: &str) -> Option<&str> {
        self.registry
            .ancestors(class)
            .into_iter()
            .find(|entry| !entry.is_extension())
            .map(|entry| entry.name())
    }

    /// Construct the native base, build the host instance and bind the two.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn create_instance(&self, class: &str) -> Result<ObjectPtr, BridgeError> {
        let entry = self
            .registry
            .get(class)
            .ok_or_else(|| DispatchError::UnregisteredClass {
                class: class.to_owned(),
            })?;
        let construct_failed = || BridgeError::ConstructFailed {
            class: class.to_owned(),
        };
        let ClassConstructor::Extension(factory) = entry.constructor() else {
            return Err(construct_failed());
        };
        let base = self.native_base(class).ok_or_else(construct_failed)?;

        let api = self.bridge.api();
        let object = Lifetime::scope(self.bridge.clone(), |lt| {
            let name = StringName::new_in(lt, base);
            api.classdb_construct_object(name.get().0)
        });
        if object.is_null() {
            return Err(construct_failed());
        }

        let handle = self.instances.insert(class, object, factory(object));
        Lifetime::scope(self.bridge.clone(), |lt| {
            let name = StringName::new_in(lt, class);
            api.object_set_instance(object, name.get().0, handle);
        });
        tracing::debug!(class, base, ?object, ?handle, "host instance created");
        Ok(object)
    }

    /// Resolve `method` for `class` into something the engine can call.
    pub(crate) fn get_virtual(
        &self,
        class: &str,
        method: &str,
    ) -> Result<Option<VirtualCall>, DispatchError> {
        match self.registry.resolve_virtual(class, method) {
            Ok(Resolution::Override { class: owner, method: f }) => {
                tracing::trace!(class, method, %owner, "virtual resolved to host override");
                let instances = Arc::clone(&self.instances);
                let call: VirtualCall = Arc::new(
                    move |instance: InstanceHandle,
                          args: &[Slot],
                          ret: &mut Slot|
                          -> Result<(), DispatchError> {
                        instances.with_instance(instance, |this| f(this, ArgFrame::new(args), ret))?
                    },
                );
                Ok(Some(call))
            }
            Ok(Resolution::EngineDefault { .. }) => Ok(None),
            Err(err) => {
                tracing::error!(class, method, %err, "unresolved virtual method");
                Err(err)
            }
        }
    }
}

pub(crate) struct ExtensionCallbacks {
    class: String,
    runtime: Weak<RuntimeShared>,
}

impl ExtensionCallbacks {
    pub(crate) fn new(class: &str, runtime: Weak<RuntimeShared>) -> Self {
        Self {
            class: class.to_owned(),
            runtime,
        }
    }

    fn runtime(&self) -> Result<Arc<RuntimeShared>, DispatchError> {
        self.runtime.upgrade().ok_or_else(|| DispatchError::RuntimeGone {
            class: self.class.clone(),
        })
    }
}

impl ExtensionClassCallbacks for ExtensionCallbacks {
    fn create_instance(&self) -> ObjectPtr {
        let result = self
            .runtime()
            .map_err(BridgeError::from)
            .and_then(|rt| rt.create_instance(&self.class));
        match result {
            Ok(object) => object,
            Err(err) => {
                tracing::error!(class = %self.class, %err, "could not create host instance");
                ObjectPtr::NULL
            }
        }
    }

    fn free_instance(&self, instance: InstanceHandle) {
        // After shutdown the instances were already dropped with the runtime.
        if let Some(rt) = self.runtime.upgrade() {
            let removed = rt.instances.remove(instance);
            tracing::debug!(class = %self.class, ?instance, removed, "host instance freed");
        }
    }

    fn get_virtual(&self, name: &str) -> Result<Option<VirtualCall>, DispatchError> {
        self.runtime()?.get_virtual(&self.class, name)
    }
}

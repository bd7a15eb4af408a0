use gdbridge_core::{BridgeError, CallFrame, GString, GodotClass, InstanceId, MethodFlags};
use gdbridge_registry::VirtualMethod;

use super::Object;
use crate::method_bind::MethodBindDescriptor;
use crate::runtime::Runtime;

pub const GET_CLASS: MethodBindDescriptor =
    MethodBindDescriptor::new("Object", "get_class", 201670096, 0).with_flags(MethodFlags::CONST);
pub const GET_INSTANCE_ID: MethodBindDescriptor =
    MethodBindDescriptor::new("Object", "get_instance_id", 3905245786, 0)
        .with_flags(MethodFlags::CONST);

/// `_notification(what)`
pub struct Notification;

impl VirtualMethod for Notification {
    const NAME: &'static str = "_notification";
    type Owner = Object;
    type Args = (i64,);
    type Ret = ();
}

impl Object {
    /// The dynamic class name, as reported by the object itself.
    pub fn get_class(self, rt: &Runtime) -> Result<String, BridgeError> {
        let name: GString = rt.call(&GET_CLASS, self.object_ptr(), CallFrame::<0>::new())?;
        Ok(rt.scope(|lt| lt.adopt(name).get().to_rust(rt.api())))
    }

    pub fn get_instance_id(self, rt: &Runtime) -> Result<InstanceId, BridgeError> {
        let id: u64 = rt.call(&GET_INSTANCE_ID, self.object_ptr(), CallFrame::<0>::new())?;
        Ok(InstanceId(id))
    }
}

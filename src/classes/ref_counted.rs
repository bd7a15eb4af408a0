use gdbridge_core::{BridgeError, CallFrame, GodotClass, MethodFlags};

use super::RefCounted;
use crate::method_bind::MethodBindDescriptor;
use crate::runtime::Runtime;

pub const GET_REFERENCE_COUNT: MethodBindDescriptor =
    MethodBindDescriptor::new("RefCounted", "get_reference_count", 3905245786, 0)
        .with_flags(MethodFlags::CONST);

impl RefCounted {
    /// The engine's current count, including references the host holds.
    pub fn get_reference_count(self, rt: &Runtime) -> Result<i64, BridgeError> {
        rt.call(&GET_REFERENCE_COUNT, self.object_ptr(), CallFrame::<0>::new())
    }
}

use gdbridge_core::{BridgeError, CallFrame, GodotClass, MethodFlags, Root};

use super::Engine;
use crate::method_bind::MethodBindDescriptor;
use crate::runtime::Runtime;

pub const GET_PROCESS_FRAMES: MethodBindDescriptor =
    MethodBindDescriptor::new("Engine", "get_process_frames", 3905245786, 0)
        .with_flags(MethodFlags::CONST);
pub const IS_EDITOR_HINT: MethodBindDescriptor =
    MethodBindDescriptor::new("Engine", "is_editor_hint", 36873697, 0)
        .with_flags(MethodFlags::CONST);

impl Engine {
    pub fn singleton(rt: &Runtime) -> Result<Root<Engine>, BridgeError> {
        rt.singleton::<Engine>()
    }

    /// Idle frames processed since startup.
    pub fn get_process_frames(self, rt: &Runtime) -> Result<u64, BridgeError> {
        rt.call(&GET_PROCESS_FRAMES, self.object_ptr(), CallFrame::<0>::new())
    }

    pub fn is_editor_hint(self, rt: &Runtime) -> Result<bool, BridgeError> {
        rt.call(&IS_EDITOR_HINT, self.object_ptr(), CallFrame::<0>::new())
    }
}

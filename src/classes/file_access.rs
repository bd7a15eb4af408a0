//! `FileAccess` statics. The class itself cannot be constructed.

use gdbridge_core::{BridgeError, CallFrame, ErrorCode, GString, ObjectPtr};

use super::FileAccess;
use crate::method_bind::MethodBindDescriptor;
use crate::runtime::Runtime;

pub const FILE_EXISTS: MethodBindDescriptor =
    MethodBindDescriptor::new_static("FileAccess", "file_exists", 2323990056, 1);
pub const GET_UNIX_PERMISSIONS: MethodBindDescriptor =
    MethodBindDescriptor::new_static("FileAccess", "get_unix_permissions", 524341837, 1);
pub const SET_UNIX_PERMISSIONS: MethodBindDescriptor =
    MethodBindDescriptor::new_static("FileAccess", "set_unix_permissions", 846038644, 2);

impl FileAccess {
    pub fn file_exists(rt: &Runtime, path: &str) -> Result<bool, BridgeError> {
        rt.scope(|lt| {
            let path = GString::new_in(lt, path);
            let mut frame = CallFrame::<1>::new();
            frame.arg(path.get());
            rt.call(&FILE_EXISTS, ObjectPtr::NULL, frame)
        })
    }

    /// Unix mode bits of `path`; 0 if it does not exist.
    pub fn get_unix_permissions(rt: &Runtime, path: &str) -> Result<u32, BridgeError> {
        rt.scope(|lt| {
            let path = GString::new_in(lt, path);
            let mut frame = CallFrame::<1>::new();
            frame.arg(path.get());
            rt.call(&GET_UNIX_PERMISSIONS, ObjectPtr::NULL, frame)
        })
    }

    pub fn set_unix_permissions(
        rt: &Runtime,
        path: &str,
        permissions: u32,
    ) -> Result<ErrorCode, BridgeError> {
        rt.scope(|lt| {
            let path = GString::new_in(lt, path);
            let mut frame = CallFrame::<2>::new();
            frame.arg(path.get()).arg(permissions);
            rt.call(&SET_UNIX_PERMISSIONS, ObjectPtr::NULL, frame)
        })
    }
}

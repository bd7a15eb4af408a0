//! Adapter for the engine's C pointer-call entry point.
//!
//! The native convention passes an array of pointers, one per argument slot,
//! plus a pointer to the return storage:
//!
//! ```text
//! void ptrcall(method_bind, instance, const void **args, void *ret)
//! ```
//!
//! A backend over a real engine interface table implements
//! `ExtensionApi::object_method_bind_ptrcall` by forwarding to
//! [`NativePtrcall::call`]. The in-process software engine dispatches in Rust
//! and does not go through it.

use std::ffi::c_void;

use crate::convert::Slot;
use crate::handle::{MethodBind, ObjectPtr};

/// Raw `object_method_bind_ptrcall` function pointer.
pub type PtrcallFn = unsafe extern "C" fn(
    method: *const c_void,
    instance: *mut c_void,
    args: *const *const c_void,
    ret: *mut c_void,
);

/// Args beyond this many spill to the heap.
const INLINE_ARGS: usize = 16;

/// A pointer-call entry point loaded from the engine.
#[derive(Clone, Copy, Debug)]
pub struct NativePtrcall {
    func: PtrcallFn,
}

impl NativePtrcall {
    /// # Safety
    ///
    /// `func` must implement the engine's pointer-call convention.
    pub unsafe fn from_raw(func: PtrcallFn) -> Self {
        Self { func }
    }

    /// Invoke `bind` on `receiver` with slot arguments.
    ///
    /// # Safety
    ///
    /// `bind` must be a live method bind whose signature matches `args` and
    /// `ret`, and `receiver` must be a live object of the bind's class (or
    /// null for static methods).
    pub unsafe fn call(
        &self,
        bind: MethodBind,
        receiver: ObjectPtr,
        args: &[Slot],
        ret: &mut Slot,
    ) {
        let ret_ptr = ret as *mut Slot as *mut c_void;
        if args.len() <= INLINE_ARGS {
            let mut ptrs = [std::ptr::null::<c_void>(); INLINE_ARGS];
            for (dst, slot) in ptrs.iter_mut().zip(args) {
                *dst = slot as *const Slot as *const c_void;
            }
            // SAFETY: upheld by the caller; `ptrs` outlives the call.
            unsafe { (self.func)(bind.0.as_ptr(), receiver.as_ptr(), ptrs.as_ptr(), ret_ptr) }
        } else {
            let ptrs: Vec<*const c_void> = args
                .iter()
                .map(|slot| slot as *const Slot as *const c_void)
                .collect();
            // SAFETY: as above.
            unsafe { (self.func)(bind.0.as_ptr(), receiver.as_ptr(), ptrs.as_ptr(), ret_ptr) }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{FromSlot, IntoSlot};
    use crate::handle::Handle;

    /// Sums `count` i64 arguments, where `count` is the method bind word.
    unsafe extern "C" fn summing_ptrcall(
        method: *const c_void,
        instance: *mut c_void,
        args: *const *const c_void,
        ret: *mut c_void,
    ) {
        let count = method as usize;
        let mut total = instance as usize as i64;
        for i in 0..count {
            // SAFETY: the test passes `count` valid slot pointers.
            let slot = unsafe { &*(*args.add(i) as *const Slot) };
            total += slot.word(0) as i64;
        }
        // SAFETY: `ret` points at a Slot.
        unsafe { *(ret as *mut Slot) = total.into_slot() };
    }

    fn call_with(count: usize) -> i64 {
        let native = unsafe { NativePtrcall::from_raw(summing_ptrcall) };
        let args: Vec<Slot> = (1..=count as i64).map(IntoSlot::into_slot).collect();
        let mut ret = Slot::ZERO;
        let bind = MethodBind(Handle::from_word(count as u64));
        unsafe { native.call(bind, ObjectPtr::from_word(100), &args, &mut ret) };
        i64::from_slot(&ret).unwrap()
    }

    #[test]
    fn packs_inline_arguments() {
        assert_eq!(call_with(0), 100);
        assert_eq!(call_with(3), 106);
    }

    #[test]
    fn packs_spilled_arguments() {
        assert_eq!(call_with(20), 100 + 210);
    }
}

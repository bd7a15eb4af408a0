//! Call frames: argument and return storage for one native call.
//!
//! A frame is built, handed to exactly one native call, read, and freed:
//!
//! ```ignore
//! let mut frame = CallFrame::<1>::new();
//! frame.arg(include_internal);
//! let ret = frame.ret::<i64>();
//! runtime.ptrcall(&GET_CHILD_COUNT, node.object_ptr(), &mut frame)?;
//! let count = frame.read(ret);
//! frame.free();
//! ```
//!
//! `free` consumes the frame, so freeing twice does not compile:
//!
//! ```compile_fail
//! use gdbridge_core::callframe::CallFrame;
//!
//! let frame = CallFrame::<0>::new();
//! frame.free();
//! frame.free();
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::convert::{FromSlot, IntoSlot, Slot};
use crate::error::{ConversionError, DispatchError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameState {
    Building,
    Called,
    Freed,
}

/// Typed marker for the return slot of a frame.
#[must_use]
pub struct Ret<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Ret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ret<{}>", std::any::type_name::<T>())
    }
}

/// Argument and return storage sized to a call's signature.
pub struct CallFrame<const N: usize> {
    args: [Slot; N],
    len: usize,
    ret: Slot,
    state: FrameState,
}

impl<const N: usize> CallFrame<N> {
    pub fn new() -> Self {
        Self {
            args: [Slot::ZERO; N],
            len: 0,
            ret: Slot::ZERO,
            state: FrameState::Building,
        }
    }

    /// Append the next argument.
    ///
    /// # Panics
    ///
    /// Panics if all `N` slots are filled or the frame was already used.
    pub fn arg<T: IntoSlot>(&mut self, value: T) -> &mut Self {
        assert_eq!(
            self.state,
            FrameState::Building,
            "arguments must be written before the call"
        );
        assert!(self.len < N, "call frame holds only {N} argument(s)");
        self.args[self.len] = value.into_slot();
        self.len += 1;
        self
    }

    /// Reserve the return slot as a `T`. Use `()` for calls with no result.
    pub fn ret<T: FromSlot>(&mut self) -> Ret<T> {
        assert_eq!(self.state, FrameState::Building);
        Ret {
            _marker: PhantomData,
        }
    }

    /// Arguments written so far.
    pub fn args(&self) -> &[Slot] {
        &self.args[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Split into the argument array and return slot for the native call,
    /// marking the frame as called.
    ///
    /// # Panics
    ///
    /// Panics if the frame was already handed to a call.
    pub fn begin_call(&mut self) -> (&[Slot], &mut Slot) {
        assert_eq!(
            self.state,
            FrameState::Building,
            "call frame reused for a second call"
        );
        self.state = FrameState::Called;
        (&self.args[..self.len], &mut self.ret)
    }

    /// Decode the return slot.
    ///
    /// # Panics
    ///
    /// Panics if the native call has not happened yet.
    pub fn read<T: FromSlot>(&self, _ret: Ret<T>) -> Result<T, ConversionError> {
        assert_eq!(
            self.state,
            FrameState::Called,
            "return slot read before the call completed"
        );
        T::from_slot(&self.ret)
    }

    /// The raw return slot.
    pub fn return_slot(&self) -> &Slot {
        &self.ret
    }

    /// Mark the frame finished. Slots are plain words; a return value that
    /// owns engine memory is released by whoever took it out with `read`.
    pub fn free(mut self) {
        self.state = FrameState::Freed;
    }
}

impl<const N: usize> Default for CallFrame<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Drop for CallFrame<N> {
    fn drop(&mut self) {
        // Frames abandoned before their call (an early `?`) are fine.
        if self.state == FrameState::Called && !std::thread::panicking() {
            debug_assert!(false, "call frame dropped after its call without free()");
        }
    }
}

impl<const N: usize> fmt::Debug for CallFrame<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallFrame")
            .field("capacity", &N)
            .field("args", &self.args())
            .field("state", &self.state)
            .finish()
    }
}

// ============================================================================
// Incoming arguments
// ============================================================================

/// Read-only view of the arguments the engine passes to a virtual override.
#[derive(Clone, Copy, Debug)]
pub struct ArgFrame<'a> {
    slots: &'a [Slot],
}

impl<'a> ArgFrame<'a> {
    pub fn new(slots: &'a [Slot]) -> Self {
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Decode argument `index`.
    pub fn get<T: FromSlot>(&self, index: usize) -> Result<T, DispatchError> {
        let slot = self.slots.get(index).ok_or(DispatchError::ArgumentCount {
            method: "<virtual>",
            expected: index + 1,
            actual: self.slots.len(),
        })?;
        T::from_slot(slot).map_err(|source| DispatchError::Argument { index, source })
    }

    pub fn slots(&self) -> &'a [Slot] {
        self.slots
    }
}

//! Raw engine handles.
//!
//! A [`Handle`] is a fixed-width sequence of machine words identifying an
//! engine-side value. It carries no ownership or validity information on its
//! own; pairing a handle with an ownership tag (see [`crate::ownership`]) is
//! what gives it a lifetime.

use std::ffi::c_void;
use std::fmt;

/// A single native word.
pub type Word = u64;

/// An opaque fixed-width engine handle of `N` words.
///
/// Handles are compared by value. Width depends on the handle kind: objects
/// and strings are one word wide, variants three.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Handle<const N: usize>([Word; N]);

/// Pointer to an engine object.
pub type ObjectPtr = Handle<1>;

/// Engine `String` storage.
pub type StringPtr = Handle<1>;

/// Engine `StringName` storage.
pub type StringNamePtr = Handle<1>;

/// Engine `Variant` storage (type word plus two payload words).
pub type VariantPtr = Handle<3>;

impl<const N: usize> Handle<N> {
    /// The all-zero handle.
    pub const NULL: Self = Self([0; N]);

    /// Build a handle from its words.
    pub const fn from_words(words: [Word; N]) -> Self {
        Self(words)
    }

    /// The words making up this handle.
    pub const fn words(&self) -> [Word; N] {
        self.0
    }

    /// True when every word is zero.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }
}

impl Handle<1> {
    /// Wrap a single word.
    pub const fn from_word(word: Word) -> Self {
        Self([word])
    }

    /// The single word of a pointer-sized handle.
    pub const fn word(&self) -> Word {
        self.0[0]
    }

    /// Wrap a raw native pointer.
    pub fn from_ptr(ptr: *const c_void) -> Self {
        Self([ptr as usize as Word])
    }

    /// The handle as a raw native pointer.
    pub fn as_ptr(&self) -> *mut c_void {
        self.0[0] as usize as *mut c_void
    }
}

impl<const N: usize> Default for Handle<N> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<const N: usize> fmt::Debug for Handle<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(")?;
        for (i, word) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{word:#x}")?;
        }
        write!(f, ")")
    }
}

/// A resolved native method bind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct MethodBind(pub Handle<1>);

impl MethodBind {
    pub const NULL: Self = Self(Handle::NULL);

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Engine-assigned object identity, stable across the object's lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

/// Host-side identity of an extension instance, handed to the engine when
/// an object is bound to host data.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct InstanceHandle(pub u64);

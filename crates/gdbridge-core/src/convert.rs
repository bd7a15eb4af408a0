//! Slot storage and the conversion traits used to marshal call arguments.
//!
//! Every argument and return value crossing the native boundary occupies one
//! [`Slot`] of three words, wide enough for the largest handle (a variant).
//!
//! - [`IntoSlot`]: encode a host value into a slot
//! - [`FromSlot`]: decode a host value out of a slot
//!
//! ## Encodings
//!
//! - Integers: sign-extended `i64` in word 0, bounds-checked on decode
//! - Floats: `f64` bits in word 0 (`f32` is widened)
//! - Boolean: 0 or 1 in word 0
//! - Handles: their words, left-aligned
//! - Unit: nothing is written, nothing is read

use crate::error::ConversionError;
use crate::error_code::ErrorCode;
use crate::handle::{Handle, MethodBind, Word};

/// Number of words in a slot.
pub const SLOT_WORDS: usize = 3;

/// One argument or return cell.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[repr(C)]
pub struct Slot(pub [Word; SLOT_WORDS]);

impl Slot {
    pub const ZERO: Slot = Slot([0; SLOT_WORDS]);

    /// Slot with only the first word set.
    pub const fn from_word(word: Word) -> Self {
        Slot([word, 0, 0])
    }

    pub const fn word(&self, index: usize) -> Word {
        self.0[index]
    }

    pub const fn words(&self) -> [Word; SLOT_WORDS] {
        self.0
    }
}

/// Decode a value from a slot.
pub trait FromSlot: Sized {
    /// Returns a `ConversionError` if the slot cannot represent `Self`.
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError>;
}

/// Encode a value into a slot.
pub trait IntoSlot {
    fn into_slot(self) -> Slot;
}

// ============================================================================
// Integer implementations
// ============================================================================

macro_rules! impl_slot_int {
    ($($ty:ty),*) => {
        $(
            impl FromSlot for $ty {
                fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
                    let v = slot.0[0] as i64;
                    // narrowing check
                    if v >= Self::MIN as i64 && v <= Self::MAX as i64 {
                        Ok(v as Self)
                    } else {
                        Err(ConversionError::IntegerOverflow {
                            value: v,
                            target_type: stringify!($ty),
                        })
                    }
                }
            }

            impl IntoSlot for $ty {
                fn into_slot(self) -> Slot {
                    Slot::from_word(self as i64 as Word)
                }
            }
        )*
    };
}

impl_slot_int!(i8, i16, i32, i64, u8, u16, u32);

impl FromSlot for u64 {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        let v = slot.0[0] as i64;
        if v < 0 {
            return Err(ConversionError::IntegerOverflow {
                value: v,
                target_type: "u64",
            });
        }
        Ok(v as u64)
    }
}

impl IntoSlot for u64 {
    fn into_slot(self) -> Slot {
        Slot::from_word(self)
    }
}

// ============================================================================
// Float implementations
// ============================================================================

impl FromSlot for f64 {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        Ok(f64::from_bits(slot.0[0]))
    }
}

impl IntoSlot for f64 {
    fn into_slot(self) -> Slot {
        Slot::from_word(self.to_bits())
    }
}

impl FromSlot for f32 {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        Ok(f64::from_bits(slot.0[0]) as f32)
    }
}

impl IntoSlot for f32 {
    fn into_slot(self) -> Slot {
        (self as f64).into_slot()
    }
}

// ============================================================================
// Bool, unit, error codes
// ============================================================================

impl FromSlot for bool {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        match slot.0[0] {
            0 => Ok(false),
            1 => Ok(true),
            word => Err(ConversionError::InvalidBool { word }),
        }
    }
}

impl IntoSlot for bool {
    fn into_slot(self) -> Slot {
        Slot::from_word(self as Word)
    }
}

impl FromSlot for () {
    fn from_slot(_slot: &Slot) -> Result<Self, ConversionError> {
        Ok(())
    }
}

impl IntoSlot for () {
    fn into_slot(self) -> Slot {
        Slot::ZERO
    }
}

impl FromSlot for ErrorCode {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        let raw = slot.0[0] as i64;
        ErrorCode::try_from(raw).map_err(|_| ConversionError::UnknownErrorCode(raw))
    }
}

impl IntoSlot for ErrorCode {
    fn into_slot(self) -> Slot {
        i64::from(self).into_slot()
    }
}

// ============================================================================
// Handles
// ============================================================================

macro_rules! impl_slot_handle {
    ($($n:literal),*) => {
        $(
            impl FromSlot for Handle<$n> {
                fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
                    let mut words = [0; $n];
                    words.copy_from_slice(&slot.0[..$n]);
                    Ok(Handle::from_words(words))
                }
            }

            impl IntoSlot for Handle<$n> {
                fn into_slot(self) -> Slot {
                    let mut slot = Slot::ZERO;
                    slot.0[..$n].copy_from_slice(&self.words());
                    slot
                }
            }
        )*
    };
}

impl_slot_handle!(1, 2, 3);

impl FromSlot for MethodBind {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        Handle::<1>::from_slot(slot).map(MethodBind)
    }
}

impl IntoSlot for MethodBind {
    fn into_slot(self) -> Slot {
        self.0.into_slot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_is_checked() {
        let slot = 300i64.into_slot();
        assert_eq!(i32::from_slot(&slot), Ok(300));
        assert_eq!(
            u8::from_slot(&slot),
            Err(ConversionError::IntegerOverflow {
                value: 300,
                target_type: "u8"
            })
        );
    }

    #[test]
    fn negative_ints_sign_extend() {
        let slot = (-5i32).into_slot();
        assert_eq!(i64::from_slot(&slot), Ok(-5));
        assert!(u64::from_slot(&slot).is_err());
    }

    #[test]
    fn floats_use_bit_patterns() {
        let slot = 0.25f64.into_slot();
        assert_eq!(slot.word(0), 0.25f64.to_bits());
        assert_eq!(f32::from_slot(&slot), Ok(0.25));
    }

    #[test]
    fn bool_rejects_garbage() {
        assert_eq!(bool::from_slot(&Slot::from_word(1)), Ok(true));
        assert_eq!(
            bool::from_slot(&Slot::from_word(7)),
            Err(ConversionError::InvalidBool { word: 7 })
        );
    }

    #[test]
    fn error_code_decoding() {
        assert_eq!(
            ErrorCode::from_slot(&9i64.into_slot()),
            Ok(ErrorCode::ErrFileBadPath)
        );
        assert_eq!(
            ErrorCode::from_slot(&77i64.into_slot()),
            Err(ConversionError::UnknownErrorCode(77))
        );
    }

    #[test]
    fn handles_fill_leading_words() {
        let h = Handle::<3>::from_words([1, 2, 3]);
        assert_eq!(h.into_slot(), Slot([1, 2, 3]));
        let p = Handle::<1>::from_word(0xabc);
        assert_eq!(p.into_slot(), Slot([0xabc, 0, 0]));
        assert_eq!(Handle::<1>::from_slot(&Slot([0xabc, 9, 9])), Ok(p));
    }
}

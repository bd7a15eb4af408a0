//! Engine `Variant` values.
//!
//! A variant is three words: the type tag followed by a two-word payload.
//! Scalars are stored inline and need no engine involvement; anything that
//! owns engine memory (strings, containers) is built and destroyed by the
//! engine.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::convert::{FromSlot, IntoSlot, SLOT_WORDS, Slot};
use crate::error::ConversionError;
use crate::handle::{ObjectPtr, VariantPtr, Word};
use crate::ownership::{Lifetime, Local, Ownable};
use crate::refcount::RefCountBridge;
use crate::strings::GString;

/// Type tag stored in the first word of a variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u64)]
pub enum VariantType {
    Nil = 0,
    Bool = 1,
    Int = 2,
    Float = 3,
    String = 4,
    Vector2 = 5,
    Vector2i = 6,
    Rect2 = 7,
    Rect2i = 8,
    Vector3 = 9,
    Vector3i = 10,
    Transform2D = 11,
    Vector4 = 12,
    Vector4i = 13,
    Plane = 14,
    Quaternion = 15,
    Aabb = 16,
    Basis = 17,
    Transform3D = 18,
    Projection = 19,
    Color = 20,
    StringName = 21,
    NodePath = 22,
    Rid = 23,
    Object = 24,
    Callable = 25,
    Signal = 26,
    Dictionary = 27,
    Array = 28,
    PackedByteArray = 29,
    PackedInt32Array = 30,
    PackedInt64Array = 31,
    PackedFloat32Array = 32,
    PackedFloat64Array = 33,
    PackedStringArray = 34,
    PackedVector2Array = 35,
    PackedVector3Array = 36,
    PackedColorArray = 37,
    PackedVector4Array = 38,
}

impl VariantType {
    pub fn name(self) -> &'static str {
        match self {
            VariantType::Nil => "Nil",
            VariantType::Bool => "bool",
            VariantType::Int => "int",
            VariantType::Float => "float",
            VariantType::String => "String",
            VariantType::StringName => "StringName",
            VariantType::Object => "Object",
            VariantType::Dictionary => "Dictionary",
            VariantType::Array => "Array",
            _ => "builtin",
        }
    }

    /// Whether values of this type carry engine-owned memory.
    pub fn needs_destructor(self) -> bool {
        !matches!(
            self,
            VariantType::Nil
                | VariantType::Bool
                | VariantType::Int
                | VariantType::Float
                | VariantType::Object
        )
    }
}

/// A variant handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Variant(pub VariantPtr);

impl Variant {
    pub const NIL: Variant = Variant(VariantPtr::NULL);

    fn inline(ty: VariantType, payload: Word) -> Self {
        Variant(VariantPtr::from_words([ty.into(), payload, 0]))
    }

    pub fn from_bool(value: bool) -> Self {
        Self::inline(VariantType::Bool, value as Word)
    }

    pub fn from_int(value: i64) -> Self {
        Self::inline(VariantType::Int, value as Word)
    }

    pub fn from_float(value: f64) -> Self {
        Self::inline(VariantType::Float, value.to_bits())
    }

    pub fn from_object(object: ObjectPtr) -> Self {
        Self::inline(VariantType::Object, object.word())
    }

    /// Build a `String` variant owned by `lifetime`.
    pub fn from_str_in<'lt>(lifetime: &'lt Lifetime, text: &str) -> Local<'lt, Variant> {
        let string = GString::new_in(lifetime, text);
        let ptr = lifetime.api().variant_from_string(string.get().0);
        lifetime.adopt(Variant(ptr))
    }

    pub fn variant_type(self) -> Result<VariantType, ConversionError> {
        let raw = self.0.words()[0];
        VariantType::try_from(raw).map_err(|_| ConversionError::UnknownVariantType(raw))
    }

    pub fn is_nil(self) -> bool {
        self.variant_type() == Ok(VariantType::Nil)
    }

    pub fn to_bool(self) -> Result<bool, ConversionError> {
        self.expect(VariantType::Bool).map(|w| w != 0)
    }

    pub fn to_int(self) -> Result<i64, ConversionError> {
        self.expect(VariantType::Int).map(|w| w as i64)
    }

    pub fn to_float(self) -> Result<f64, ConversionError> {
        self.expect(VariantType::Float).map(f64::from_bits)
    }

    pub fn to_object(self) -> Result<ObjectPtr, ConversionError> {
        self.expect(VariantType::Object).map(ObjectPtr::from_word)
    }

    /// Stringify through the engine. The intermediate `String` is owned by
    /// `lifetime`.
    pub fn stringify(self, lifetime: &Lifetime) -> String {
        let ptr = lifetime.api().variant_to_string(self.0);
        let string = lifetime.adopt(GString(ptr));
        string.get().to_rust(lifetime.api())
    }

    fn expect(self, ty: VariantType) -> Result<Word, ConversionError> {
        let actual = self.variant_type()?;
        if actual == ty {
            Ok(self.0.words()[1])
        } else {
            Err(ConversionError::VariantType {
                expected: ty.name(),
                actual: actual.name(),
            })
        }
    }
}

impl Ownable for Variant {
    const KIND_NAME: &'static str = "Variant";

    fn to_words(self) -> [Word; SLOT_WORDS] {
        self.0.words()
    }

    fn from_words(words: [Word; SLOT_WORDS]) -> Self {
        Variant(VariantPtr::from_words(words))
    }

    fn release(self, bridge: &RefCountBridge) {
        // Unknown tags are handed to the engine as well.
        if self.variant_type().is_ok_and(|ty| !ty.needs_destructor()) {
            return;
        }
        bridge.api().variant_destroy(self.0);
    }
}

impl IntoSlot for Variant {
    fn into_slot(self) -> Slot {
        self.0.into_slot()
    }
}

impl FromSlot for Variant {
    fn from_slot(slot: &Slot) -> Result<Self, ConversionError> {
        VariantPtr::from_slot(slot).map(Variant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use std::sync::Arc;

    #[test]
    fn scalars_are_inline() {
        assert_eq!(Variant::from_int(-3).to_int(), Ok(-3));
        assert_eq!(Variant::from_float(1.5).to_float(), Ok(1.5));
        assert_eq!(Variant::from_bool(true).to_bool(), Ok(true));
        assert!(Variant::NIL.is_nil());
        assert_eq!(
            Variant::from_int(1).to_bool(),
            Err(ConversionError::VariantType {
                expected: "bool",
                actual: "int"
            })
        );
    }

    #[test]
    fn unknown_tags_are_reported() {
        let v = Variant(VariantPtr::from_words([99, 0, 0]));
        assert_eq!(v.variant_type(), Err(ConversionError::UnknownVariantType(99)));
    }

    #[test]
    fn string_variants_are_destroyed_with_the_scope() {
        let api = Arc::new(FakeApi::default());
        let bridge = Arc::new(RefCountBridge::new(api.clone(), false));
        Lifetime::scope(bridge, |lt| {
            let v = Variant::from_str_in(lt, "label");
            assert_eq!(v.get().variant_type(), Ok(VariantType::String));
            assert_eq!(v.get().stringify(lt), "label");
        });
        assert_eq!(api.live_strings(), 0);
    }
}

//! Virtual method tables.
//!
//! An engine class *declares* the virtuals it will ask about; a host class
//! *overrides* some of them. Overrides are stored as type-erased callables
//! built from typed closures, so argument decoding happens in one place.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use gdbridge_core::{ArgFrame, DispatchError, FromSlot, GodotClass, IntoSlot, Slot};

/// Describes one engine virtual method at the type level.
///
/// Implemented by marker types next to the class that declares the virtual.
pub trait VirtualMethod: 'static {
    /// Engine name, e.g. `"_process"`.
    const NAME: &'static str;
    /// The class that declares the virtual.
    type Owner: GodotClass;
    /// Argument tuple.
    type Args: FromArgs;
    type Ret: IntoSlot;
}

/// Decode a tuple of arguments from an [`ArgFrame`].
pub trait FromArgs: Sized {
    const ARITY: usize;

    fn from_args(method: &'static str, args: &ArgFrame<'_>) -> Result<Self, DispatchError>;
}

macro_rules! impl_from_args {
    ($arity:literal; $($ty:ident $idx:tt),*) => {
        impl<$($ty: FromSlot),*> FromArgs for ($($ty,)*) {
            const ARITY: usize = $arity;

            #[allow(unused_variables)]
            fn from_args(method: &'static str, args: &ArgFrame<'_>) -> Result<Self, DispatchError> {
                if args.len() != $arity {
                    return Err(DispatchError::ArgumentCount {
                        method,
                        expected: $arity,
                        actual: args.len(),
                    });
                }
                Ok(($(args.get::<$ty>($idx)?,)*))
            }
        }
    };
}

impl_from_args!(0;);
impl_from_args!(1; A 0);
impl_from_args!(2; A 0, B 1);
impl_from_args!(3; A 0, B 1, C 2);
impl_from_args!(4; A 0, B 1, C 2, D 3);

/// Type-erased override: host instance, incoming arguments, return slot.
pub type VirtualFn =
    Arc<dyn Fn(&mut dyn Any, ArgFrame<'_>, &mut Slot) -> Result<(), DispatchError> + Send + Sync>;

/// Build the erased callable for a typed override on host type `T`.
pub fn erase_override<T, M, F>(f: F) -> VirtualFn
where
    T: Any,
    M: VirtualMethod,
    F: Fn(&mut T, M::Args) -> M::Ret + Send + Sync + 'static,
{
    Arc::new(
        move |instance: &mut dyn Any,
              args: ArgFrame<'_>,
              ret: &mut Slot|
              -> Result<(), DispatchError> {
            let this = instance
                .downcast_mut::<T>()
                .ok_or(DispatchError::InstanceType {
                    expected: std::any::type_name::<T>(),
                })?;
            let args = M::Args::from_args(M::NAME, &args)?;
            *ret = f(this, args).into_slot();
            Ok(())
        },
    )
}

/// One entry of a class's virtual table.
#[derive(Clone)]
pub enum VirtualSlot {
    /// The engine provides the behavior.
    Declared,
    /// The host replaces it.
    Override(VirtualFn),
}

impl fmt::Debug for VirtualSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VirtualSlot::Declared => write!(f, "Declared"),
            VirtualSlot::Override(_) => write!(f, "Override(..)"),
        }
    }
}

/// Virtual methods a single class declares or overrides, by name.
#[derive(Clone, Debug, Default)]
pub struct VirtualTable {
    slots: FxHashMap<&'static str, VirtualSlot>,
}

impl VirtualTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &'static str) {
        self.slots.entry(name).or_insert(VirtualSlot::Declared);
    }

    pub fn set_override(&mut self, name: &'static str, f: VirtualFn) {
        self.slots.insert(name, VirtualSlot::Override(f));
    }

    pub fn get(&self, name: &str) -> Option<&VirtualSlot> {
        self.slots.get(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Names in this table, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.slots.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdbridge_core::ConversionError;

    #[test]
    fn tuple_arity_is_checked() {
        let slots = [1i64.into_slot()];
        let args = ArgFrame::new(&slots);
        assert_eq!(<(i64,)>::from_args("_m", &args), Ok((1,)));
        assert_eq!(
            <(i64, i64)>::from_args("_m", &args),
            Err(DispatchError::ArgumentCount {
                method: "_m",
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(<()>::ARITY, 0);
    }

    #[test]
    fn argument_errors_carry_index() {
        let slots = [1i64.into_slot(), 5i64.into_slot()];
        let args = ArgFrame::new(&slots);
        assert_eq!(
            <(i64, bool)>::from_args("_m", &args),
            Err(DispatchError::Argument {
                index: 1,
                source: ConversionError::InvalidBool { word: 5 }
            })
        );
    }

    #[test]
    fn declare_does_not_clobber_override() {
        let mut table = VirtualTable::new();
        table.set_override(
            "_ready",
            Arc::new(
                |_: &mut dyn Any, _: ArgFrame<'_>, _: &mut Slot| -> Result<(), DispatchError> {
                    Ok(())
                },
            ),
        );
        table.declare("_ready");
        assert!(matches!(table.get("_ready"), Some(VirtualSlot::Override(_))));
        table.declare("_process");
        assert_eq!(table.names(), vec!["_process", "_ready"]);
    }
}

//! Host instance storage.
//!
//! Each native object of a host-defined class is bound to one boxed host
//! value. The engine refers to it by [`InstanceHandle`]. While a virtual call
//! runs, the value is leased out of the table, so a second dispatch on the
//! same instance fails with [`DispatchError::InstanceBusy`] instead of
//! aliasing it.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use gdbridge_core::{DispatchError, InstanceHandle, ObjectPtr};

type Boxed = Box<dyn Any + Send>;

enum Occupancy {
    Idle(Boxed),
    Busy,
}

struct Record {
    class: String,
    object: ObjectPtr,
    occupancy: Occupancy,
}

#[derive(Default)]
struct Table {
    records: FxHashMap<InstanceHandle, Record>,
    by_object: FxHashMap<ObjectPtr, InstanceHandle>,
}

/// All live host instances of one runtime.
pub struct InstanceStorage {
    next: AtomicU64,
    table: Mutex<Table>,
}

impl Default for InstanceStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceStorage {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
            table: Mutex::new(Table::default()),
        }
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, class: &str, object: ObjectPtr, instance: Boxed) -> InstanceHandle {
        let handle = InstanceHandle(self.next.fetch_add(1, Ordering::Relaxed));
        let mut table = self.table();
        table.records.insert(
            handle,
            Record {
                class: class.to_owned(),
                object,
                occupancy: Occupancy::Idle(instance),
            },
        );
        table.by_object.insert(object, handle);
        handle
    }

    /// Unbind an instance. A leased instance is dropped when its lease ends.
    pub fn remove(&self, handle: InstanceHandle) -> bool {
        let removed = {
            let mut table = self.table();
            let removed = table.records.remove(&handle);
            if let Some(record) = &removed {
                table.by_object.remove(&record.object);
            }
            removed
        };
        removed.is_some()
    }

    pub fn handle_for(&self, object: ObjectPtr) -> Option<InstanceHandle> {
        self.table().by_object.get(&object).copied()
    }

    pub fn class_of(&self, handle: InstanceHandle) -> Option<String> {
        self.table().records.get(&handle).map(|r| r.class.clone())
    }

    pub fn object_of(&self, handle: InstanceHandle) -> Option<ObjectPtr> {
        self.table().records.get(&handle).map(|r| r.object)
    }

    pub fn is_busy(&self, handle: InstanceHandle) -> bool {
        matches!(
            self.table().records.get(&handle),
            Some(Record {
                occupancy: Occupancy::Busy,
                ..
            })
        )
    }

    pub fn len(&self) -> usize {
        self.table().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` with exclusive access to the instance.
    ///
    /// The table lock is not held while `f` runs.
    pub fn with_instance<R>(
        &self,
        handle: InstanceHandle,
        f: impl FnOnce(&mut dyn Any) -> R,
    ) -> Result<R, DispatchError> {
        let mut lease = self.lease(handle)?;
        let result = match lease.instance.as_mut() {
            Some(instance) => f(instance.as_mut()),
            None => return Err(DispatchError::InstanceNotFound(handle)),
        };
        Ok(result)
    }

    /// Typed form of [`with_instance`](Self::with_instance).
    pub fn with<T: Any, R>(
        &self,
        handle: InstanceHandle,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, DispatchError> {
        self.with_instance(handle, |instance| {
            instance
                .downcast_mut::<T>()
                .map(f)
                .ok_or(DispatchError::InstanceType {
                    expected: std::any::type_name::<T>(),
                })
        })?
    }

    fn lease(&self, handle: InstanceHandle) -> Result<Lease<'_>, DispatchError> {
        let mut table = self.table();
        let record = table
            .records
            .get_mut(&handle)
            .ok_or(DispatchError::InstanceNotFound(handle))?;
        match std::mem::replace(&mut record.occupancy, Occupancy::Busy) {
            Occupancy::Idle(instance) => Ok(Lease {
                storage: self,
                handle,
                instance: Some(instance),
            }),
            Occupancy::Busy => Err(DispatchError::InstanceBusy(handle)),
        }
    }
}

impl std::fmt::Debug for InstanceStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceStorage")
            .field("instances", &self.len())
            .finish()
    }
}

/// Puts the instance back on drop, including during unwinding.
struct Lease<'a> {
    storage: &'a InstanceStorage,
    handle: InstanceHandle,
    instance: Option<Boxed>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let Some(instance) = self.instance.take() else {
            return;
        };
        let orphan = {
            let mut table = self.storage.table();
            match table.records.get_mut(&self.handle) {
                Some(record) => {
                    record.occupancy = Occupancy::Idle(instance);
                    None
                }
                None => Some(instance),
            }
        };
        // Freed by the engine mid-call; drop outside the lock.
        drop(orphan);
    }
}

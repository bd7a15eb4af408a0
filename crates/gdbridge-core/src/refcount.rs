//! Reference-count bridge for engine `RefCounted` objects.
//!
//! The engine owns the reference count; the host only asks it to increment
//! and decrement. An optional ledger records how many references the host
//! itself holds per object so that double releases are caught before they
//! reach the engine and leaks can be reported at shutdown.

use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::api::ExtensionApi;
use crate::handle::ObjectPtr;

/// Host side of the engine's reference counting.
pub struct RefCountBridge {
    api: Arc<dyn ExtensionApi>,
    ledger: Option<Mutex<FxHashMap<ObjectPtr, u32>>>,
}

impl RefCountBridge {
    /// Create a bridge; `ledger` enables host-side bookkeeping.
    pub fn new(api: Arc<dyn ExtensionApi>, ledger: bool) -> Self {
        Self {
            api,
            ledger: ledger.then(|| Mutex::new(FxHashMap::default())),
        }
    }

    /// The engine this bridge talks to.
    pub fn api(&self) -> &dyn ExtensionApi {
        self.api.as_ref()
    }

    pub fn api_arc(&self) -> &Arc<dyn ExtensionApi> {
        &self.api
    }

    /// Acquire one reference on behalf of the host.
    ///
    /// # Panics
    ///
    /// Panics if the object is not reference counted.
    pub fn reference(&self, object: ObjectPtr) {
        if !self.api.ref_reference(object) {
            panic!("reference() on {object:?}, which is not a RefCounted object");
        }
        self.with_ledger(|ledger| *ledger.entry(object).or_insert(0) += 1);
        tracing::trace!(?object, "reference");
    }

    /// Drop one host reference. Returns true when the engine count reached
    /// zero and the object should be destroyed.
    ///
    /// # Panics
    ///
    /// Panics when the ledger is enabled and the host holds no reference to
    /// `object` (a double release).
    pub fn unreference(&self, object: ObjectPtr) -> bool {
        self.with_ledger(|ledger| match ledger.get_mut(&object) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    ledger.remove(&object);
                }
            }
            _ => panic!(
                "reference count underflow on {object:?}: released more often than acquired"
            ),
        });
        let zero = self.api.ref_unreference(object);
        tracing::trace!(?object, zero, "unreference");
        zero
    }

    /// Drop one host reference and destroy the object if it was the last.
    pub fn release(&self, object: ObjectPtr) {
        if self.unreference(object) {
            tracing::debug!(?object, "last reference released, destroying");
            self.api.object_destroy(object);
        }
    }

    /// Stop tracking one host reference without touching the engine count.
    ///
    /// Used when the reference itself is handed over to the engine.
    pub fn forget(&self, object: ObjectPtr) {
        self.with_ledger(|ledger| {
            if let Some(count) = ledger.get_mut(&object) {
                *count -= 1;
                if *count == 0 {
                    ledger.remove(&object);
                }
            }
        });
    }

    /// Start tracking a reference the host already holds, without touching
    /// the engine count. The inverse of [`forget`](Self::forget).
    pub fn reclaim(&self, object: ObjectPtr) {
        self.with_ledger(|ledger| *ledger.entry(object).or_insert(0) += 1);
    }

    /// Acquire a reference if `object` is reference counted. Manually
    /// managed objects need nothing.
    pub fn acquire_object(&self, object: ObjectPtr) {
        if self.api.object_is_ref_counted(object) {
            self.reference(object);
        }
    }

    /// Release `object` by the rule its class follows: drop a reference
    /// when it is reference counted, destroy it otherwise.
    pub fn release_object(&self, object: ObjectPtr) {
        if self.api.object_is_ref_counted(object) {
            self.release(object);
        } else {
            self.api.object_destroy(object);
        }
    }

    /// Number of references the host holds on `object`, if tracked.
    pub fn host_references(&self, object: ObjectPtr) -> Option<u32> {
        let ledger = self.ledger.as_ref()?;
        let ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        Some(ledger.get(&object).copied().unwrap_or(0))
    }

    /// Objects the host still holds references to.
    pub fn outstanding(&self) -> Vec<(ObjectPtr, u32)> {
        let Some(ledger) = self.ledger.as_ref() else {
            return Vec::new();
        };
        let ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = ledger.iter().map(|(k, v)| (*k, *v)).collect();
        out.sort_by_key(|(ptr, _)| ptr.word());
        out
    }

    pub fn ledger_enabled(&self) -> bool {
        self.ledger.is_some()
    }

    fn with_ledger(&self, f: impl FnOnce(&mut FxHashMap<ObjectPtr, u32>)) {
        if let Some(ledger) = &self.ledger {
            let mut ledger = ledger.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut ledger);
        }
    }
}

impl std::fmt::Debug for RefCountBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefCountBridge")
            .field("ledger", &self.ledger.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    fn bridge() -> (Arc<FakeApi>, RefCountBridge) {
        let api = Arc::new(FakeApi::default());
        let bridge = RefCountBridge::new(api.clone(), true);
        (api, bridge)
    }

    #[test]
    fn counts_are_balanced() {
        let (api, bridge) = bridge();
        let obj = api.new_ref_counted();
        bridge.reference(obj);
        bridge.reference(obj);
        assert_eq!(api.ref_count(obj), Some(2));
        assert_eq!(bridge.host_references(obj), Some(2));

        assert!(!bridge.unreference(obj));
        bridge.release(obj);
        assert_eq!(api.ref_count(obj), None);
        assert_eq!(api.destroyed(), vec![obj]);
        assert!(bridge.outstanding().is_empty());
    }

    #[test]
    #[should_panic(expected = "reference count underflow")]
    fn double_release_panics() {
        let (api, bridge) = bridge();
        let obj = api.new_ref_counted();
        bridge.reference(obj);
        bridge.release(obj);
        bridge.release(obj);
    }

    #[test]
    #[should_panic(expected = "not a RefCounted object")]
    fn reference_on_plain_object_panics() {
        let (api, bridge) = bridge();
        let obj = api.new_object();
        bridge.reference(obj);
    }

    #[test]
    fn outstanding_lists_leaks() {
        let (api, bridge) = bridge();
        let a = api.new_ref_counted();
        let b = api.new_ref_counted();
        bridge.reference(a);
        bridge.reference(b);
        bridge.reference(b);
        assert_eq!(bridge.outstanding(), vec![(a, 1), (b, 2)]);
        bridge.forget(b);
        assert_eq!(bridge.host_references(b), Some(1));
    }

    #[test]
    fn forget_and_reclaim_leave_engine_count_alone() {
        let (api, bridge) = bridge();
        let obj = api.new_ref_counted();
        bridge.reference(obj);
        bridge.forget(obj);
        assert!(bridge.outstanding().is_empty());
        bridge.reclaim(obj);
        assert_eq!(bridge.host_references(obj), Some(1));
        assert_eq!(api.ref_count(obj), Some(1));
        bridge.release(obj);
        assert!(!api.is_alive(obj));
    }

    #[test]
    fn object_rules_follow_the_engine_class() {
        let (api, bridge) = bridge();
        let counted = api.new_ref_counted();
        let plain = api.new_object();

        bridge.acquire_object(counted);
        bridge.acquire_object(plain);
        assert_eq!(api.ref_count(counted), Some(1));
        assert_eq!(bridge.outstanding(), vec![(counted, 1)]);

        bridge.reference(counted);
        bridge.release_object(counted);
        assert!(api.is_alive(counted));
        bridge.release_object(counted);
        bridge.release_object(plain);
        assert_eq!(api.destroyed(), vec![counted, plain]);
    }

    #[test]
    fn ledger_can_be_disabled() {
        let api = Arc::new(FakeApi::default());
        let bridge = RefCountBridge::new(api.clone(), false);
        let obj = api.new_ref_counted();
        bridge.reference(obj);
        assert_eq!(bridge.host_references(obj), None);
        bridge.release(obj);
        assert_eq!(api.destroyed(), vec![obj]);
    }
}

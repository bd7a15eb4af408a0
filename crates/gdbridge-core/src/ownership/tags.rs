use std::fmt;
use std::sync::Arc;

use super::lifetime::{Lifetime, Local};
use super::{Ownable, RefCountedKind};
use crate::refcount::RefCountBridge;

// ============================================================================
// Shared
// ============================================================================

/// A shared ownership tag over a reference-counted engine object.
///
/// Each `Shared` holds one engine reference. Cloning acquires another,
/// dropping releases it, and the object is destroyed when the engine count
/// reaches zero.
pub struct Shared<K: RefCountedKind> {
    value: K,
    bridge: Arc<RefCountBridge>,
    handed_off: bool,
}

impl<K: RefCountedKind> Shared<K> {
    /// The object, without giving up this reference.
    pub fn get(&self) -> K {
        self.value
    }

    /// Hand this reference to a native call that takes ownership of it.
    pub fn into_transferred(mut self) -> Transferred<K> {
        self.value.disown(&self.bridge);
        self.handed_off = true;
        Transferred::held(self.value)
    }

    pub fn bridge(&self) -> &Arc<RefCountBridge> {
        &self.bridge
    }
}

impl<K: RefCountedKind> Clone for Shared<K> {
    fn clone(&self) -> Self {
        self.bridge.reference(self.value.object_ptr());
        Self {
            value: self.value,
            bridge: self.bridge.clone(),
            handed_off: false,
        }
    }
}

impl<K: RefCountedKind> Drop for Shared<K> {
    fn drop(&mut self) {
        if !self.handed_off {
            self.bridge.release(self.value.object_ptr());
        }
    }
}

impl<K: RefCountedKind> PartialEq for Shared<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value.object_ptr() == other.value.object_ptr()
    }
}

impl<K: RefCountedKind> fmt::Debug for Shared<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&self.value).finish()
    }
}

// ============================================================================
// Root
// ============================================================================

/// A tag for values that are never released by the host: engine singletons
/// and non-owning references to objects owned elsewhere.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Root<K: Ownable>(K);

impl<K: Ownable> Root<K> {
    pub fn new(value: K) -> Self {
        Root(value)
    }

    pub fn get(&self) -> K {
        self.0
    }
}

impl<K: Ownable> fmt::Debug for Root<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Root").field(&self.0).finish()
    }
}

// ============================================================================
// Transferred
// ============================================================================

/// A value whose ownership was just handed across the boundary.
///
/// Returned by native calls (engine to host) and produced by
/// [`Local::transfer`] (host to engine). It must be consumed exactly once:
/// [`cycle`](Transferred::cycle) into a [`Shared`], [`scope`](Transferred::scope)
/// into a [`Lifetime`], or [`end`](Transferred::end) for a native call that
/// takes ownership.
///
/// A value from the engine carries no host reference yet; one coming from a
/// host tag already does. Converting it back into a tag acquires a reference
/// only in the first case.
#[must_use = "transferred ownership must be converted with cycle(), scope() or end()"]
pub struct Transferred<K: Ownable> {
    value: K,
    held: bool,
}

impl<K: Ownable> Transferred<K> {
    /// A value handed over by the engine.
    pub fn new(value: K) -> Self {
        Transferred { value, held: false }
    }

    /// A value whose host hold (one reference, for reference-counted kinds)
    /// travels with it.
    pub(crate) fn held(value: K) -> Self {
        Transferred { value, held: true }
    }

    /// Whether the value already carries a host hold.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// The value, for inspection before conversion.
    pub fn peek(&self) -> K {
        self.value
    }

    /// Give the raw value to whoever takes ownership next.
    pub fn end(self) -> K {
        let value = self.value;
        std::mem::forget(self);
        value
    }

    /// Move ownership into an arena scope.
    pub fn scope<'lt>(self, lifetime: &'lt Lifetime) -> Local<'lt, K> {
        let held = self.held;
        let value = self.end();
        if held {
            lifetime.adopt_held(value)
        } else {
            lifetime.adopt(value)
        }
    }

    /// Map the value to a related kind (an upcast of the same object). A
    /// host hold carries over.
    pub fn map<J: Ownable>(self, f: impl FnOnce(K) -> J) -> Transferred<J> {
        let held = self.held;
        Transferred {
            value: f(self.end()),
            held,
        }
    }
}

impl<K: RefCountedKind> Transferred<K> {
    /// Start sharing the object. A value from the engine gets the host's
    /// first reference; a held value keeps the one it carries.
    pub fn cycle(self, bridge: &Arc<RefCountBridge>) -> Shared<K> {
        let held = self.held;
        let value = self.end();
        if held {
            value.reclaim(bridge);
        } else {
            value.acquire(bridge);
        }
        Shared {
            value,
            bridge: bridge.clone(),
            handed_off: false,
        }
    }
}

impl<K: Ownable> Drop for Transferred<K> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        tracing::warn!(
            kind = K::KIND_NAME,
            value = ?self.value,
            held = self.held,
            "transferred value dropped without conversion"
        );
        debug_assert!(
            false,
            "{} {:?} was transferred but never converted",
            K::KIND_NAME,
            self.value
        );
    }
}

impl<K: Ownable> fmt::Debug for Transferred<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transferred").field(&self.value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::SLOT_WORDS;
    use crate::handle::{ObjectPtr, Word};
    use crate::testing::FakeApi;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Counted(ObjectPtr);

    impl Ownable for Counted {
        const KIND_NAME: &'static str = "Counted";
        fn to_words(self) -> [Word; SLOT_WORDS] {
            [self.0.word(), 0, 0]
        }
        fn from_words(words: [Word; SLOT_WORDS]) -> Self {
            Counted(ObjectPtr::from_word(words[0]))
        }
        fn acquire(self, bridge: &RefCountBridge) {
            bridge.reference(self.0);
        }
        fn disown(self, bridge: &RefCountBridge) {
            bridge.forget(self.0);
        }
        fn reclaim(self, bridge: &RefCountBridge) {
            bridge.reclaim(self.0);
        }
        fn release(self, bridge: &RefCountBridge) {
            bridge.release(self.0);
        }
    }

    impl RefCountedKind for Counted {
        fn object_ptr(self) -> ObjectPtr {
            self.0
        }
    }

    fn setup() -> (Arc<FakeApi>, Arc<RefCountBridge>) {
        let api = Arc::new(FakeApi::default());
        let bridge = Arc::new(RefCountBridge::new(api.clone(), true));
        (api, bridge)
    }

    #[test]
    fn cycle_increments_and_last_drop_destroys() {
        let (api, bridge) = setup();
        let obj = api.new_ref_counted();
        let first = Transferred::new(Counted(obj)).cycle(&bridge);
        assert_eq!(api.ref_count(obj), Some(1));

        let second = first.clone();
        assert_eq!(api.ref_count(obj), Some(2));
        assert_eq!(first, second);

        drop(first);
        assert_eq!(api.ref_count(obj), Some(1));
        assert!(api.is_alive(obj));

        drop(second);
        assert!(!api.is_alive(obj));
        assert_eq!(api.destroyed(), vec![obj]);
    }

    #[test]
    fn shared_into_transferred_keeps_engine_count() {
        let (api, bridge) = setup();
        let obj = api.new_ref_counted();
        let shared = Transferred::new(Counted(obj)).cycle(&bridge);
        let handed = shared.into_transferred();
        assert_eq!(api.ref_count(obj), Some(1));
        assert_eq!(bridge.host_references(obj), Some(0));
        assert_eq!(handed.end(), Counted(obj));
    }

    #[test]
    fn recycling_a_handed_off_reference_does_not_add_one() {
        let (api, bridge) = setup();
        let obj = api.new_ref_counted();
        let shared = Transferred::new(Counted(obj)).cycle(&bridge);
        let again = shared.into_transferred();
        assert!(again.is_held());
        let again = again.cycle(&bridge);
        assert_eq!(api.ref_count(obj), Some(1));
        assert_eq!(bridge.host_references(obj), Some(1));
        drop(again);
        assert!(!api.is_alive(obj));
        assert!(bridge.outstanding().is_empty());
    }

    #[test]
    fn local_transfer_carries_its_reference() {
        let (api, bridge) = setup();
        let obj = api.new_ref_counted();
        let shared = Lifetime::scope(bridge.clone(), |lt| {
            let local = Transferred::new(Counted(obj)).scope(lt);
            let handed = local.transfer();
            assert_eq!(bridge.host_references(obj), Some(0));
            handed.cycle(&bridge)
        });
        assert_eq!(api.ref_count(obj), Some(1));
        assert_eq!(bridge.outstanding(), vec![(obj, 1)]);
        drop(shared);
        assert!(!api.is_alive(obj));
        assert!(bridge.outstanding().is_empty());
    }

    #[test]
    fn held_value_scoped_is_released_once() {
        let (api, bridge) = setup();
        let obj = api.new_ref_counted();
        let shared = Transferred::new(Counted(obj)).cycle(&bridge);
        let keep = shared.clone();
        Lifetime::scope(bridge.clone(), |lt| {
            shared.into_transferred().scope(lt);
            assert_eq!(api.ref_count(obj), Some(2));
        });
        assert_eq!(api.ref_count(obj), Some(1));
        drop(keep);
        assert!(!api.is_alive(obj));
    }

    #[test]
    fn scoped_ref_counted_is_released_at_close() {
        let (api, bridge) = setup();
        let obj = api.new_ref_counted();
        Lifetime::scope(bridge.clone(), |lt| {
            let local = Transferred::new(Counted(obj)).scope(lt);
            assert_eq!(api.ref_count(obj), Some(1));
            assert_eq!(local.get(), Counted(obj));
        });
        assert!(!api.is_alive(obj));
    }

    #[test]
    fn root_is_never_released() {
        let (api, _bridge) = setup();
        let obj = api.new_object();
        let root = Root::new(Counted(obj));
        let copy = root;
        assert_eq!(copy.get(), root.get());
        drop(root);
        assert!(api.is_alive(obj));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "never converted")]
    fn dropping_unconverted_transfer_is_caught() {
        let (api, _bridge) = setup();
        let _ = Transferred::new(Counted(api.new_ref_counted()));
    }
}

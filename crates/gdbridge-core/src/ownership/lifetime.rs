//! Arena scopes for engine values.
//!
//! A [`Lifetime`] owns every value adopted into it. Values can be ended early
//! (handing ownership elsewhere); whatever is still live when the scope
//! closes is released exactly once, newest first.
//!
//! Entries use generational indices so that an id kept past `end` or past
//! the scope's close is detected instead of touching a reused entry.

use std::any::TypeId;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::Ownable;
use super::tags::Transferred;
use crate::api::ExtensionApi;
use crate::convert::SLOT_WORDS;
use crate::handle::Word;
use crate::refcount::RefCountBridge;

/// Identifies one entry of a [`Lifetime`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TagId {
    /// Index into the scope's entries
    pub index: u32,
    /// Generation for use-after-end detection
    pub generation: u32,
}

type ReleaseFn = fn([Word; SLOT_WORDS], &RefCountBridge);

struct Entry {
    generation: u32,
    live: Option<LiveEntry>,
}

struct LiveEntry {
    words: [Word; SLOT_WORDS],
    type_id: TypeId,
    kind: &'static str,
    release: ReleaseFn,
}

fn release_erased<K: Ownable>(words: [Word; SLOT_WORDS], bridge: &RefCountBridge) {
    K::from_words(words).release(bridge);
}

/// An arena scope owning engine values.
///
/// Not `Sync`: a scope belongs to the thread that created it.
pub struct Lifetime {
    bridge: Arc<RefCountBridge>,
    entries: RefCell<Vec<Entry>>,
    free_list: RefCell<Vec<u32>>,
    order: RefCell<Vec<TagId>>,
    closed: Cell<bool>,
}

impl Lifetime {
    /// Open a new scope.
    pub fn new(bridge: Arc<RefCountBridge>) -> Self {
        Self {
            bridge,
            entries: RefCell::new(Vec::new()),
            free_list: RefCell::new(Vec::new()),
            order: RefCell::new(Vec::new()),
            closed: Cell::new(false),
        }
    }

    /// Run `f` inside a fresh scope, closing it afterwards.
    pub fn scope<R>(bridge: Arc<RefCountBridge>, f: impl FnOnce(&Lifetime) -> R) -> R {
        let lifetime = Lifetime::new(bridge);
        let result = f(&lifetime);
        lifetime.close();
        result
    }

    pub fn bridge(&self) -> &Arc<RefCountBridge> {
        &self.bridge
    }

    pub fn api(&self) -> &dyn ExtensionApi {
        self.bridge.api()
    }

    /// Take ownership of `value` for the rest of this scope.
    ///
    /// # Panics
    ///
    /// Panics if the scope has been closed.
    pub fn adopt<K: Ownable>(&self, value: K) -> Local<'_, K> {
        self.check_open::<K>();
        value.acquire(&self.bridge);
        self.insert(value)
    }

    /// Take ownership of `value` whose host hold already exists.
    pub(super) fn adopt_held<K: Ownable>(&self, value: K) -> Local<'_, K> {
        self.check_open::<K>();
        value.reclaim(&self.bridge);
        self.insert(value)
    }

    fn check_open<K: Ownable>(&self) {
        if self.closed.get() {
            panic!("cannot adopt {} into a closed lifetime", K::KIND_NAME);
        }
    }

    fn insert<K: Ownable>(&self, value: K) -> Local<'_, K> {
        let live = LiveEntry {
            words: value.to_words(),
            type_id: TypeId::of::<K>(),
            kind: K::KIND_NAME,
            release: release_erased::<K>,
        };

        let mut entries = self.entries.borrow_mut();
        let id = if let Some(index) = self.free_list.borrow_mut().pop() {
            let entry = &mut entries[index as usize];
            entry.live = Some(live);
            TagId {
                index,
                generation: entry.generation,
            }
        } else {
            let index = entries.len() as u32;
            entries.push(Entry {
                generation: 0,
                live: Some(live),
            });
            TagId {
                index,
                generation: 0,
            }
        };
        self.order.borrow_mut().push(id);

        Local {
            lifetime: self,
            id,
            _kind: PhantomData,
        }
    }

    /// Read the value behind `id` without releasing it.
    ///
    /// # Panics
    ///
    /// Panics if the tag was already ended, the scope closed, or `K` is not
    /// the kind that was adopted.
    pub fn get<K: Ownable>(&self, id: TagId) -> K {
        let entries = self.entries.borrow();
        let live = Self::live_entry::<K>(&entries, id);
        K::from_words(live.words)
    }

    /// Stop tracking `id` without releasing it and return the value.
    ///
    /// # Panics
    ///
    /// Same conditions as [`Lifetime::get`].
    pub fn end<K: Ownable>(&self, id: TagId) -> K {
        let mut entries = self.entries.borrow_mut();
        let words = Self::live_entry::<K>(&entries, id).words;
        let entry = &mut entries[id.index as usize];
        entry.live = None;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_list.borrow_mut().push(id.index);
        self.order.borrow_mut().retain(|other| *other != id);
        K::from_words(words)
    }

    /// Whether `id` still refers to a live entry.
    pub fn is_live(&self, id: TagId) -> bool {
        self.entries
            .borrow()
            .get(id.index as usize)
            .is_some_and(|e| e.generation == id.generation && e.live.is_some())
    }

    /// Number of values this scope will release on close.
    pub fn live_count(&self) -> usize {
        self.order.borrow().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Release every live value, newest first. Closing twice is a no-op.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn close(&self) {
        if self.closed.replace(true) {
            return;
        }
        let order = std::mem::take(&mut *self.order.borrow_mut());
        let mut pending = Vec::with_capacity(order.len());
        {
            let mut entries = self.entries.borrow_mut();
            for id in order.iter().rev() {
                let entry = &mut entries[id.index as usize];
                if let Some(live) = entry.live.take() {
                    entry.generation = entry.generation.wrapping_add(1);
                    pending.push(live);
                }
            }
        }
        tracing::trace!(released = pending.len(), "closing lifetime");
        // Entries are unborrowed here so releases may re-enter the host.
        for live in pending {
            (live.release)(live.words, &self.bridge);
        }
    }

    fn live_entry<'e, K: Ownable>(entries: &'e [Entry], id: TagId) -> &'e LiveEntry {
        let live = entries
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.live.as_ref());
        let Some(live) = live else {
            panic!("{} tag {id:?} already ended", K::KIND_NAME);
        };
        if live.type_id != TypeId::of::<K>() {
            panic!(
                "tag {id:?} holds a {}, not a {}",
                live.kind,
                K::KIND_NAME
            );
        }
        live
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifetime")
            .field("live", &self.live_count())
            .field("closed", &self.closed.get())
            .finish()
    }
}

/// An arena-scoped ownership tag.
///
/// Released when its [`Lifetime`] closes unless ended first. Borrowing the
/// scope keeps the tag from escaping it.
pub struct Local<'lt, K: Ownable> {
    lifetime: &'lt Lifetime,
    id: TagId,
    _kind: PhantomData<K>,
}

impl<'lt, K: Ownable> Local<'lt, K> {
    /// The value, still owned by the scope.
    pub fn get(&self) -> K {
        self.lifetime.get(self.id)
    }

    /// Take the value out of the scope for one final use.
    pub fn end(self) -> K {
        self.lifetime.end(self.id)
    }

    /// End the tag and hand ownership to a native call. The host's hold
    /// moves into the returned value.
    pub fn transfer(self) -> Transferred<K> {
        let lifetime = self.lifetime;
        let value = self.end();
        value.disown(lifetime.bridge());
        Transferred::held(value)
    }

    /// Id for code that needs to keep a reference to the entry.
    pub fn id(&self) -> TagId {
        self.id
    }

    pub fn lifetime(&self) -> &'lt Lifetime {
        self.lifetime
    }
}

impl<K: Ownable> fmt::Debug for Local<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Local")
            .field("kind", &K::KIND_NAME)
            .field("id", &self.id)
            .finish()
    }
}

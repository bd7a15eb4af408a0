//! Method bind descriptors and the per-runtime bind cache.
//!
//! Glue code describes each engine method once, as a `const`
//! [`MethodBindDescriptor`]. The first call through a descriptor asks the
//! engine for the bind; later calls hit the cache.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::xxh64;

use gdbridge_core::{MethodBind, MethodFlags};

/// Static identity of an engine method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodBindDescriptor {
    pub class: &'static str,
    pub method: &'static str,
    /// Signature hash from the engine's API description.
    pub hash: i64,
    pub argc: usize,
    pub flags: MethodFlags,
}

impl MethodBindDescriptor {
    pub const fn new(class: &'static str, method: &'static str, hash: i64, argc: usize) -> Self {
        Self {
            class,
            method,
            hash,
            argc,
            flags: MethodFlags::NORMAL,
        }
    }

    /// A method called without a receiver.
    pub const fn new_static(
        class: &'static str,
        method: &'static str,
        hash: i64,
        argc: usize,
    ) -> Self {
        Self {
            class,
            method,
            hash,
            argc,
            flags: MethodFlags::NORMAL.union(MethodFlags::STATIC),
        }
    }

    pub const fn with_flags(self, flags: MethodFlags) -> Self {
        Self {
            flags: self.flags.union(flags),
            ..self
        }
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MethodFlags::STATIC)
    }

    /// Cache key over class, method and hash.
    pub fn cache_key(&self) -> u64 {
        let mut bytes = Vec::with_capacity(self.class.len() + self.method.len() + 10);
        bytes.extend_from_slice(self.class.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(self.method.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&self.hash.to_le_bytes());
        xxh64(&bytes, 0)
    }
}

/// Resolved binds, keyed by [`MethodBindDescriptor::cache_key`].
#[derive(Debug, Default)]
pub struct MethodBindCache {
    binds: Mutex<FxHashMap<u64, MethodBind>>,
}

impl MethodBindCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, descriptor: &MethodBindDescriptor) -> Option<MethodBind> {
        self.lock().get(&descriptor.cache_key()).copied()
    }

    pub fn insert(&self, descriptor: &MethodBindDescriptor, bind: MethodBind) {
        self.lock().insert(descriptor.cache_key(), bind);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<u64, MethodBind>> {
        self.binds.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

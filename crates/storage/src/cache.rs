//! Bounded FIFO cache for immutable objects.
//!
//! Because only immutable classes are cached, an entry can never be stale;
//! the only question is whether it is present. That makes recency tracking
//! pointless: eviction is strict first-insertion-order, and reads do not
//! reorder anything. Hit/miss counters are kept for observability and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Default capacity of each object cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Bounded insertion-ordered map from fingerprint to object.
///
/// Values are handed out by clone; the underlying container is never exposed.
/// All access is serialized behind a lock; operations are O(1) map work, so
/// a single `RwLock` is sufficient.
#[derive(Debug)]
pub struct ObjectCache<T> {
    inner: RwLock<CacheInner<T>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug)]
struct CacheInner<T> {
    entries: HashMap<String, T>,
    /// Insertion order; front is the eviction candidate.
    order: VecDeque<String>,
}

impl<T: Clone> ObjectCache<T> {
    /// Creates a cache bounded to `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be positive");
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up a fingerprint. Reads never reorder entries.
    #[must_use]
    pub fn get(&self, fingerprint: &str) -> Option<T> {
        let inner = self.inner.read();
        match inner.entries.get(fingerprint) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    /// True if the fingerprint is cached. Counts as a hit or miss.
    #[must_use]
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.get(fingerprint).is_some()
    }

    /// Inserts an entry, evicting the oldest-inserted one on overflow.
    ///
    /// Re-inserting a present fingerprint replaces the value without
    /// consuming a new order slot (immutable objects make the replacement a
    /// no-op in practice).
    pub fn insert(&self, fingerprint: String, value: T) {
        let mut inner = self.inner.write();
        if inner.entries.insert(fingerprint.clone(), value).is_none() {
            inner.order.push_back(fingerprint);
            while inner.entries.len() > self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.entries.remove(&oldest);
                }
            }
        }
    }

    /// Drops an entry, if present.
    ///
    /// Needed exactly once in the object protocol: contract promotion deletes
    /// the staging document, so its cache entry must go with it.
    pub fn remove(&self, fingerprint: &str) {
        let mut inner = self.inner.write();
        if inner.entries.remove(fingerprint).is_some() {
            inner.order.retain(|key| key != fingerprint);
        }
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// True when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Total lookup hits since creation.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total lookup misses since creation.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

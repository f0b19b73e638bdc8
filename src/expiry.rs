//! Sliding-TTL expiring map.
//!
//! The building block under every in-memory cache in this crate: a key/value
//! map where each entry carries an expiry instant that is pushed forward on
//! *every* successful read, not just on insertion. Entries past their expiry
//! are invisible to iteration and counting immediately, but stay allocated
//! until an explicit [`ExpiringCache::purge`] — callers that want bounded
//! memory schedule purges around [`ExpiringCache::next_expiry`].
//!
//! ## Laziness
//!
//! Expiry is lazy by design: no background task, no timer wheel. The three
//! observable effects are kept consistent with each other:
//!
//! - `live_keys()` yields only entries whose expiry is still in the future
//! - `len()` equals exactly what `live_keys()` yields
//! - `purge()` drops everything whose expiry has passed
//!
//! A read of an expired-but-unpurged key revives it (the read slides its
//! expiry forward) without re-invoking any loader.
//!
//! ## Time injection
//!
//! Every time-dependent method has an `*_at` variant taking an explicit
//! [`Instant`]. The plain methods are thin wrappers over `Instant::now()`;
//! tests drive the `*_at` variants with fabricated instants so expiry
//! behavior is deterministic.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

struct Entry<V> {
    expires_at: Instant,
    value: V,
}

/// A key/value map with sliding time-to-live semantics.
pub struct ExpiringCache<K, V> {
    ttl: Duration,
    items: HashMap<K, Entry<V>>,
}

impl<K: Eq + Hash + Clone, V> ExpiringCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            items: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up `key`, sliding its expiry forward on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.get_at(Instant::now(), key)
    }

    pub fn get_at(&mut self, now: Instant, key: &K) -> Option<&V> {
        let ttl = self.ttl;
        self.items.get_mut(key).map(|entry| {
            entry.expires_at = now + ttl;
            &entry.value
        })
    }

    /// Insert or replace `key`, giving it a full TTL from `now`.
    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(Instant::now(), key, value);
    }

    pub fn insert_at(&mut self, now: Instant, key: K, value: V) {
        self.items.insert(
            key,
            Entry {
                expires_at: now + self.ttl,
                value,
            },
        );
    }

    /// Look up `key`, filling the entry from `loader` on a miss.
    ///
    /// Hits slide the expiry exactly like [`get`](Self::get). A loader
    /// failure propagates to the caller and stores nothing, so one failed
    /// load does not poison subsequent lookups.
    pub fn get_with<E>(&mut self, key: K, loader: impl FnOnce() -> Result<V, E>) -> Result<&V, E> {
        self.get_with_at(Instant::now(), key, loader)
    }

    pub fn get_with_at<E>(
        &mut self,
        now: Instant,
        key: K,
        loader: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        let ttl = self.ttl;
        match self.items.entry(key) {
            std::collections::hash_map::Entry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                entry.expires_at = now + ttl;
                Ok(&entry.value)
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                let value = loader()?;
                let entry = vacant.insert(Entry {
                    expires_at: now + ttl,
                    value,
                });
                Ok(&entry.value)
            }
        }
    }

    /// Drop `key` regardless of its expiry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.items.remove(key).map(|entry| entry.value)
    }

    /// Keys whose expiry is still in the future, in unspecified order.
    pub fn live_keys(&self) -> impl Iterator<Item = &K> {
        self.live_keys_at(Instant::now())
    }

    pub fn live_keys_at(&self, now: Instant) -> impl Iterator<Item = &K> {
        self.items
            .iter()
            .filter(move |(_, entry)| entry.expires_at > now)
            .map(|(key, _)| key)
    }

    /// Count of live entries; always equals what `live_keys()` yields.
    pub fn len(&self) -> usize {
        self.len_at(Instant::now())
    }

    pub fn len_at(&self, now: Instant) -> usize {
        self.live_keys_at(now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry whose expiry has passed.
    pub fn purge(&mut self) {
        self.purge_at(Instant::now());
    }

    pub fn purge_at(&mut self, now: Instant) {
        let before = self.items.len();
        self.items.retain(|_, entry| entry.expires_at > now);
        let dropped = before - self.items.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = self.items.len(), "purged expired entries");
        }
    }

    /// The earliest expiry across *all* stored entries, including entries
    /// that are already logically expired but not yet purged. `None` when
    /// the map holds nothing at all.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.items.values().map(|entry| entry.expires_at).min()
    }
}

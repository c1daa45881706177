//! Read-through, write-invalidated employee cache.
//!
//! # Responsibility
//! - Hold the last-known aggregate per employee id.
//! - Provide a per-key critical section so a write, its commit and its
//!   eviction are observed as one step by readers of the same key.
//!
//! # Invariants
//! - Callers evict only after the corresponding persistence commit succeeds.
//! - The key-lock table is never held while a caller's closure runs.
//! - A key-lock entry lives only while some caller holds or waits on it.

use crate::model::employee::{Employee, EmployeeId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
pub struct EmployeeCache {
    entries: DashMap<EmployeeId, Employee>,
    key_locks: DashMap<EmployeeId, Arc<Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl EmployeeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the cached aggregate, or `None` on miss.
    pub fn get(&self, id: EmployeeId) -> Option<Employee> {
        match self.entries.get(&id) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `employee` under its own id, replacing any previous entry.
    pub fn put(&self, employee: Employee) {
        self.entries.insert(employee.id, employee);
    }

    /// Removes one entry. Returns whether an entry was present.
    pub fn evict(&self, id: EmployeeId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    pub fn evict_all(&self) {
        let cleared = self.entries.len() as u64;
        self.entries.clear();
        self.evictions.fetch_add(cleared, Ordering::Relaxed);
    }

    pub fn contains(&self, id: EmployeeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Runs `f` while holding the critical section for `id`.
    ///
    /// Calls for different ids do not block each other. Calls must not nest
    /// for the same id.
    pub fn with_key_lock<T>(&self, id: EmployeeId, f: impl FnOnce() -> T) -> T {
        // Clone the Arc out so the DashMap shard guard is released first.
        let lock = Arc::clone(self.key_locks.entry(id).or_default().value());
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);
        // Clones are only taken under the shard lock, so a count of one here
        // means no other caller holds or waits on this mutex.
        self.key_locks
            .remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }
}

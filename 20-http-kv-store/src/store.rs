//! In-memory key-value storage with request accounting.
//!
//! The store is the only piece of shared mutable state in the server. Every
//! HTTP handler calls into it, and the reporter samples it on a timer.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

/// Owned copy of the store contents.
pub type Entries = BTreeMap<String, String>;

/// Request count and database size sampled under one lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub requests: u64,
    pub db_size: usize,
}

#[derive(Default)]
struct State {
    entries: Entries,
    request_count: u64,
}

impl State {
    fn stats(&self) -> StoreStats {
        StoreStats {
            requests: self.request_count,
            db_size: self.entries.len(),
        }
    }
}

/// Thread-safe key-value store shared by the HTTP handlers and the reporter.
///
/// The entries and the request counter live behind a single `Mutex`, so every
/// operation sees and leaves behind a state that existed at one point in the
/// lock's serialization order. Each public operation counts as exactly one
/// request, reads included, and the increment happens inside the same
/// critical section as the operation itself.
///
/// The map is never handed out by reference. Callers only receive owned
/// copies, which keeps lock hold times bounded by the size of the map.
#[derive(Default)]
pub struct Store {
    state: Mutex<State>,
}

impl Store {
    /// Creates an empty store with a zero request count.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `updates` into the store, overwriting existing keys.
    ///
    /// One call is one request no matter how many keys are merged, and an
    /// empty map is still counted.
    pub fn put(&self, updates: Entries) {
        let mut state = self.lock();
        state.entries.extend(updates);
        state.request_count += 1;
    }

    /// Returns an independent copy of every entry.
    ///
    /// The copy is taken while the lock is held so it never mixes two states.
    pub fn get_all(&self) -> Entries {
        let mut state = self.lock();
        state.request_count += 1;
        state.entries.clone()
    }

    /// Removes `key` and reports whether it was present before the call.
    ///
    /// The request is counted whether or not the key existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut state = self.lock();
        state.request_count += 1;
        state.entries.remove(key).is_some()
    }

    /// Counts this call, then returns the request count and size together.
    ///
    /// The returned count includes the `stats` call itself.
    pub fn stats(&self) -> StoreStats {
        let mut state = self.lock();
        state.request_count += 1;
        state.stats()
    }

    /// Samples the request count and size without counting a request.
    ///
    /// Used by the periodic reporter, which is not client traffic.
    pub fn observe(&self) -> StoreStats {
        self.lock().stats()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // None of the critical sections can panic midway through an update,
        // so a poisoned guard still holds a consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

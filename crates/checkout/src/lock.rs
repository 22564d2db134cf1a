//! Per-key mutual exclusion for request serialization.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily allocated per-key async mutexes.
///
/// Serializes work scoped to one key (one user's checkout, one order's
/// payment request) without blocking unrelated keys. Lock entries live
/// for the process lifetime.
#[derive(Default)]
pub struct KeyedLock<K> {
    locks: StdMutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLock<K> {
    /// Creates an empty lock table.
    pub fn new() -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquires the mutex for `key`, waiting if another caller holds it.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

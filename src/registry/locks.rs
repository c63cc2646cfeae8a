//! Per-key serialization
//!
//! In-process alternative to conditional writes: one async mutex per
//! phone number, held across the whole read-modify-write. Only covers
//! callers sharing this process.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::phone::PhoneKey;

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: DashMap<PhoneKey, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    ///
    /// The table entry is pruned when the returned guard is dropped, or
    /// when this future is dropped before the lock is acquired.
    pub async fn lock(&self, key: &PhoneKey) -> KeyGuard<'_> {
        let mutex = self.locks.entry(key.clone()).or_default().clone();

        // Declared before `acquire` so a cancelled wait drops the pending
        // acquisition (and its mutex handle) first, then prunes.
        let mut held = KeyGuard {
            locks: self,
            key: key.clone(),
            guard: None,
        };
        let acquire = mutex.lock_owned();
        held.guard = Some(acquire.await);
        held
    }

    fn prune(&self, key: &PhoneKey) {
        self.locks
            .remove_if(key, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    /// Number of keys with a live mutex
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one key; releases and prunes on drop
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: PhoneKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Mutex handle must go before the strong count is checked
        drop(self.guard.take());
        self.locks.prune(&self.key);
    }
}

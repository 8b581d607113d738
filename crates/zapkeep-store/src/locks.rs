// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-key async locks.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes operations on the same key while letting distinct keys proceed
/// in parallel.
#[derive(Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops the lock entry for `key` when nobody holds or waits on it.
    pub fn forget(&self, key: &str) {
        self.locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyLocks::new();
        let _guard = locks.acquire("A").await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire("A")).await;
        assert!(second.is_err(), "second acquire on the same key must wait");
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = KeyLocks::new();
        let _a = locks.acquire("A").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("B")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn forget_keeps_held_locks() {
        let locks = KeyLocks::new();
        let guard = locks.acquire("A").await;
        locks.forget("A");
        assert!(locks.locks.contains_key("A"));
        drop(guard);
        locks.forget("A");
        assert!(!locks.locks.contains_key("A"));
    }
}

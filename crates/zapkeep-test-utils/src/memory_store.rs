// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store backend.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use zapkeep_core::{HealthStatus, StoreBackend, ZapkeepError};

/// A `StoreBackend` backed by a `BTreeMap`.
///
/// `set_unavailable(true)` makes every operation fail with
/// `BackendUnavailable`, simulating a dropped Redis or MongoDB link.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes bytes directly, bypassing key validation (for corrupt-entry tests).
    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.lock().insert(key.to_string(), value.to_vec());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<(), ZapkeepError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ZapkeepError::unavailable(
                "memory",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "simulated outage"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ZapkeepError> {
        self.check()?;
        self.lock().get(key).cloned().ok_or_else(|| ZapkeepError::NotFound {
            key: key.to_string(),
        })
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ZapkeepError> {
        self.check()?;
        self.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), ZapkeepError> {
        self.check()?;
        self.lock()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| ZapkeepError::NotFound {
                key: key.to_string(),
            })
    }

    async fn list_keys(&self) -> Result<Vec<String>, ZapkeepError> {
        self.check()?;
        Ok(self.lock().keys().cloned().collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, ZapkeepError> {
        self.check()?;
        Ok(self.lock().contains_key(key))
    }

    async fn health_check(&self) -> Result<HealthStatus, ZapkeepError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Ok(HealthStatus::Unhealthy("simulated outage".to_string()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn outage_fails_every_operation() {
        let store = MemoryStore::new();
        store.set("A", b"1").await.unwrap();
        store.set_unavailable(true);
        assert!(store.get("A").await.unwrap_err().is_retryable());
        assert!(store.list_keys().await.is_err());
        store.set_unavailable(false);
        assert_eq!(store.get("A").await.unwrap(), b"1");
    }
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value contract for session/token persistence backends.

use async_trait::async_trait;

use crate::error::ZapkeepError;
use crate::types::HealthStatus;

/// Uniform key-value abstraction over session/token data.
///
/// All operations are idempotent except [`set`](StoreBackend::set), which
/// overwrites. Connectivity failures surface as
/// [`ZapkeepError::BackendUnavailable`]; callers choose the retry policy.
#[async_trait]
pub trait StoreBackend: Send + Sync + 'static {
    /// Short backend name for logs and errors (`file`, `redis`, `mongodb`).
    fn name(&self) -> &str;

    /// Returns the stored value, or `NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, ZapkeepError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ZapkeepError>;

    /// Removes `key`, or returns `NotFound` if it was absent.
    async fn delete(&self, key: &str) -> Result<(), ZapkeepError>;

    /// Lists every stored key. Used at startup to restore sessions.
    async fn list_keys(&self) -> Result<Vec<String>, ZapkeepError>;

    async fn exists(&self, key: &str) -> Result<bool, ZapkeepError>;

    /// Probes connectivity to the backend.
    async fn health_check(&self) -> Result<HealthStatus, ZapkeepError>;
}

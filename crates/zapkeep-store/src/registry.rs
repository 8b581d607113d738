// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session token lifecycle on top of one [`StoreBackend`].
//!
//! The registry is the only writer of session state. Tokens are stored as
//! JSON and mirrored in an in-memory cache so the event filter can look up
//! a session's own identity without touching the backend.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use rand::RngCore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zapkeep_core::{SessionToken, StoreBackend, ZapkeepError};

use crate::key::validate_key;
use crate::locks::KeyLocks;

/// Length of a freshly generated credential.
pub const CREDENTIAL_LEN: usize = 32;

pub struct SessionTokenRegistry {
    backend: Arc<dyn StoreBackend>,
    cache: DashMap<String, SessionToken>,
    locks: KeyLocks,
}

impl SessionTokenRegistry {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
            locks: KeyLocks::new(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    /// Creates a session with a random credential.
    ///
    /// Fails with `AlreadyExists` if the name is taken, in the cache or in
    /// the backend.
    pub async fn create_session(&self, name: &str) -> Result<SessionToken, ZapkeepError> {
        validate_key(name)?;
        let _guard = self.locks.acquire(name).await;

        if self.cache.contains_key(name) || self.backend.exists(name).await? {
            return Err(ZapkeepError::AlreadyExists {
                key: name.to_string(),
            });
        }

        let mut credential = vec![0u8; CREDENTIAL_LEN];
        rand::thread_rng().fill_bytes(&mut credential);
        let token = SessionToken::new(name, credential);

        self.persist(&token).await?;
        info!(session = name, backend = self.backend.name(), "session created");
        Ok(token)
    }

    /// Loads every persisted session.
    ///
    /// Entries that cannot be decoded are logged and skipped. A failure to
    /// list keys, or the backend going away mid-restore, is returned.
    /// Checks `cancel` before each entry.
    pub async fn restore_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SessionToken>, ZapkeepError> {
        let keys = tokio::select! {
            _ = cancel.cancelled() => return Err(ZapkeepError::Cancelled),
            keys = self.backend.list_keys() => keys?,
        };

        let mut restored = Vec::with_capacity(keys.len());
        for key in keys {
            if cancel.is_cancelled() {
                return Err(ZapkeepError::Cancelled);
            }

            let guard = self.locks.acquire(&key).await;
            let bytes = match self.backend.get(&key).await {
                Ok(bytes) => bytes,
                Err(e @ ZapkeepError::BackendUnavailable { .. }) => return Err(e),
                Err(e) if e.is_not_found() => {
                    debug!(session = %key, "session removed during restore");
                    continue;
                }
                Err(e) => {
                    warn!(session = %key, error = %e, "skipping unreadable session");
                    continue;
                }
            };

            match decode(&key, &bytes) {
                Ok(token) => {
                    self.cache.insert(key, token.clone());
                    restored.push(token);
                }
                Err(e) => warn!(session = %key, error = %e, "skipping corrupt session"),
            }
            drop(guard);
        }

        info!(
            count = restored.len(),
            backend = self.backend.name(),
            "sessions restored"
        );
        Ok(restored)
    }

    /// Updates the last-seen timestamp.
    pub async fn touch(&self, name: &str) -> Result<SessionToken, ZapkeepError> {
        self.update(name, |token| token.last_seen = Utc::now()).await
    }

    /// Deletes the session. A second revoke yields `NotFound`.
    pub async fn revoke(&self, name: &str) -> Result<(), ZapkeepError> {
        validate_key(name)?;
        let guard = self.locks.acquire(name).await;
        let result = self.backend.delete(name).await;
        self.cache.remove(name);
        drop(guard);
        self.locks.forget(name);

        result?;
        info!(session = name, "session revoked");
        Ok(())
    }

    /// Returns the session, reading through to the backend on a cache miss.
    ///
    /// The read and the cache fill happen under the key's lock, so a
    /// concurrent revoke cannot be undone by a stale read.
    pub async fn get(&self, name: &str) -> Result<SessionToken, ZapkeepError> {
        if let Some(token) = self.cache.get(name).map(|t| t.clone()) {
            return Ok(token);
        }
        validate_key(name)?;

        let guard = self.locks.acquire(name).await;
        if let Some(token) = self.cache.get(name).map(|t| t.clone()) {
            return Ok(token);
        }
        let result = self
            .backend
            .get(name)
            .await
            .and_then(|bytes| decode(name, &bytes));
        if let Ok(token) = &result {
            self.cache.insert(name.to_string(), token.clone());
        }
        drop(guard);

        if result.as_ref().is_err_and(ZapkeepError::is_not_found) {
            self.locks.forget(name);
        }
        result
    }

    /// Sessions known to this process (created or restored), sorted by name.
    pub fn list(&self) -> Vec<SessionToken> {
        let mut tokens: Vec<SessionToken> = self.cache.iter().map(|e| e.value().clone()).collect();
        tokens.sort_by(|a, b| a.name.cmp(&b.name));
        tokens
    }

    /// Replaces the credential with a refreshed blob from the automation layer.
    pub async fn store_credential(
        &self,
        name: &str,
        credential: Vec<u8>,
    ) -> Result<SessionToken, ZapkeepError> {
        self.update(name, move |token| {
            token.credential = credential;
            token.last_seen = Utc::now();
        })
        .await
    }

    /// Records the session's own JID once the automation layer authenticates.
    pub async fn bind_identity(&self, name: &str, jid: &str) -> Result<SessionToken, ZapkeepError> {
        let jid = jid.to_string();
        self.update(name, move |token| token.self_jid = Some(jid)).await
    }

    /// Self identity of a session, if bound. Sessions that were never
    /// restored are read through from the backend and cached.
    pub async fn self_identity(&self, name: &str) -> Option<String> {
        if let Some(jid) = self.cache.get(name).map(|t| t.self_jid.clone()) {
            return jid;
        }
        match self.get(name).await {
            Ok(token) => token.self_jid,
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                debug!(session = name, error = %e, "self identity lookup failed");
                None
            }
        }
    }

    async fn update<F>(&self, name: &str, apply: F) -> Result<SessionToken, ZapkeepError>
    where
        F: FnOnce(&mut SessionToken),
    {
        validate_key(name)?;
        let _guard = self.locks.acquire(name).await;
        let cached = self.cache.get(name).map(|t| t.clone());
        let mut token = match cached {
            Some(token) => token,
            None => decode(name, &self.backend.get(name).await?)?,
        };
        apply(&mut token);
        self.persist(&token).await?;
        Ok(token)
    }

    /// Writes through to the backend, then refreshes the cache.
    async fn persist(&self, token: &SessionToken) -> Result<(), ZapkeepError> {
        let bytes = serde_json::to_vec(token).map_err(ZapkeepError::storage)?;
        self.backend.set(&token.name, &bytes).await?;
        self.cache.insert(token.name.clone(), token.clone());
        Ok(())
    }
}

fn decode(key: &str, bytes: &[u8]) -> Result<SessionToken, ZapkeepError> {
    let token: SessionToken =
        serde_json::from_slice(bytes).map_err(|e| ZapkeepError::CorruptEntry {
            key: key.to_string(),
            source: Box::new(e),
        })?;
    if token.name != key {
        return Err(ZapkeepError::CorruptEntry {
            key: key.to_string(),
            source: format!("entry names session `{}`", token.name).into(),
        });
    }
    Ok(token)
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local-directory store backend.
//!
//! One `<key>.token` file per entry. Writes go to a temp file in the same
//! directory, are fsynced, then atomically renamed over the target, so a
//! crash leaves either the old or the new value and never a torn one.
//! The directory is claimed with an exclusive `fs2` lock for the lifetime
//! of the store.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tracing::debug;

use zapkeep_core::{HealthStatus, StoreBackend, ZapkeepError};

use crate::key::validate_key;
use crate::locks::KeyLocks;

const TOKEN_EXT: &str = "token";
const LOCK_FILE: &str = ".zapkeep.lock";

/// File-per-key store rooted at one directory.
pub struct FileStore {
    dir: PathBuf,
    locks: KeyLocks,
    /// Holds the directory lock until the store is dropped.
    _lock: File,
}

impl FileStore {
    /// Opens (creating if needed) the store directory and takes its lock.
    ///
    /// Fails with `BackendUnavailable` if another process holds the lock.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ZapkeepError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| ZapkeepError::unavailable("file", e))?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))
            .map_err(|e| ZapkeepError::unavailable("file", e))?;
        lock.try_lock_exclusive()
            .map_err(|e| ZapkeepError::unavailable("file", e))?;

        debug!(dir = %dir.display(), "file store opened");
        Ok(Self {
            dir,
            locks: KeyLocks::new(),
            _lock: lock,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{TOKEN_EXT}"))
    }
}

fn not_found_or_storage(key: &str, err: std::io::Error) -> ZapkeepError {
    if err.kind() == ErrorKind::NotFound {
        ZapkeepError::NotFound {
            key: key.to_string(),
        }
    } else {
        ZapkeepError::storage(err)
    }
}

/// Temp file, fsync, rename, then fsync the directory so the rename sticks.
fn write_atomic(dir: &Path, target: &Path, value: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .tempfile_in(dir)?;
    tmp.write_all(value)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;

    #[cfg(unix)]
    File::open(dir)?.sync_all()?;

    Ok(())
}

#[async_trait]
impl StoreBackend for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ZapkeepError> {
        validate_key(key)?;
        tokio::fs::read(self.path_for(key))
            .await
            .map_err(|e| not_found_or_storage(key, e))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ZapkeepError> {
        validate_key(key)?;
        let _guard = self.locks.acquire(key).await;

        let dir = self.dir.clone();
        let target = self.path_for(key);
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &value))
            .await
            .map_err(|e| ZapkeepError::Internal(format!("file write task failed: {e}")))?
            .map_err(ZapkeepError::storage)
    }

    async fn delete(&self, key: &str) -> Result<(), ZapkeepError> {
        validate_key(key)?;
        let guard = self.locks.acquire(key).await;
        let result = tokio::fs::remove_file(self.path_for(key))
            .await
            .map_err(|e| not_found_or_storage(key, e));
        drop(guard);
        self.locks.forget(key);
        result
    }

    async fn list_keys(&self) -> Result<Vec<String>, ZapkeepError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ZapkeepError::unavailable("file", e))?;

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ZapkeepError::storage)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TOKEN_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && validate_key(stem).is_ok()
            {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, ZapkeepError> {
        validate_key(key)?;
        tokio::fs::try_exists(self.path_for(key))
            .await
            .map_err(ZapkeepError::storage)
    }

    async fn health_check(&self) -> Result<HealthStatus, ZapkeepError> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.dir.display()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

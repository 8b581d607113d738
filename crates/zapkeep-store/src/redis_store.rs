// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis store backend.
//!
//! Keys live under `<redis_prefix>:<key>`; an empty prefix stores them bare.
//! The connection manager reconnects on its own after a dropped link.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use tracing::debug;

use zapkeep_config::model::DbConfig;
use zapkeep_core::{HealthStatus, StoreBackend, ZapkeepError};

use crate::key::validate_key;

/// `COUNT` hint per SCAN round trip.
const SCAN_BATCH: usize = 200;

pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    /// Connects using the `db.redis_*` descriptor.
    pub async fn connect(db: &DbConfig) -> Result<Self, ZapkeepError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(db.redis_host.clone(), db.redis_port),
            redis: RedisConnectionInfo {
                db: i64::from(db.redis_db),
                password: db.redis_password.clone(),
                ..Default::default()
            },
        };
        let client = redis::Client::open(info)
            .map_err(|e| ZapkeepError::Config(format!("invalid redis descriptor: {e}")))?;
        let conn = ConnectionManager::new(client).await.map_err(map_redis_err)?;

        debug!(
            host = %db.redis_host,
            port = db.redis_port,
            db = db.redis_db,
            prefix = %db.redis_prefix,
            "redis store connected"
        );
        Ok(Self {
            conn,
            prefix: db.redis_prefix.clone(),
        })
    }

    fn full_key(&self, key: &str) -> String {
        full_key(&self.prefix, key)
    }
}

fn full_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}:{key}")
    }
}

fn strip_prefix<'a>(prefix: &str, full: &'a str) -> Option<&'a str> {
    if prefix.is_empty() {
        Some(full)
    } else {
        full.strip_prefix(prefix)?.strip_prefix(':')
    }
}

/// Keeps the session keys under `prefix`, sorted and deduplicated.
/// SCAN may report a key more than once.
fn session_keys(prefix: &str, raw: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = raw
        .iter()
        .filter_map(|full| strip_prefix(prefix, full))
        .filter(|key| validate_key(key).is_ok())
        .map(str::to_string)
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

/// Connectivity and auth failures are transient; everything else is a
/// plain storage error.
fn map_redis_err(err: RedisError) -> ZapkeepError {
    let unavailable = err.is_io_error()
        || err.is_connection_refusal()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.kind() == redis::ErrorKind::AuthenticationFailed;
    if unavailable {
        ZapkeepError::unavailable("redis", err)
    } else {
        ZapkeepError::storage(err)
    }
}

#[async_trait]
impl StoreBackend for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, ZapkeepError> {
        validate_key(key)?;
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await.map_err(map_redis_err)?;
        value.ok_or_else(|| ZapkeepError::NotFound {
            key: key.to_string(),
        })
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), ZapkeepError> {
        validate_key(key)?;
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.full_key(key), value)
            .await
            .map_err(map_redis_err)
    }

    async fn delete(&self, key: &str) -> Result<(), ZapkeepError> {
        validate_key(key)?;
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(self.full_key(key)).await.map_err(map_redis_err)?;
        if removed == 0 {
            return Err(ZapkeepError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, ZapkeepError> {
        let mut conn = self.conn.clone();
        let pattern = self.full_key("*");
        let mut raw = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_err)?;
            raw.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(session_keys(&self.prefix, &raw))
    }

    async fn exists(&self, key: &str) -> Result<bool, ZapkeepError> {
        validate_key(key)?;
        let mut conn = self.conn.clone();
        conn.exists(self.full_key(key)).await.map_err(map_redis_err)
    }

    async fn health_check(&self) -> Result<HealthStatus, ZapkeepError> {
        let mut conn = self.conn.clone();
        let pong: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        match pong {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn keys_are_namespaced_by_prefix() {
        assert_eq!(full_key("zapkeep", "A"), "zapkeep:A");
        assert_eq!(full_key("", "A"), "A");
        assert_eq!(strip_prefix("zapkeep", "zapkeep:A"), Some("A"));
        assert_eq!(strip_prefix("", "A"), Some("A"));
    }

    #[test]
    fn foreign_and_malformed_keys_are_ignored() {
        assert_eq!(strip_prefix("zapkeep", "other:A"), None);
        // Prefix without the separator.
        assert_eq!(strip_prefix("zapkeep", "zapkeepA"), None);
        assert_eq!(strip_prefix("zapkeep", "zapkeep"), None);

        let keys = session_keys(
            "zapkeep",
            &raw(&["zapkeep:B", "other:C", "zapkeepD", "zapkeep:A", "zapkeep:B", "zapkeep:a/b"]),
        );
        assert_eq!(keys, vec!["A", "B"]);
    }

    #[test]
    fn empty_prefix_keeps_only_valid_keys() {
        let keys = session_keys("", &raw(&["A", "x:y/z", ""]));
        assert_eq!(keys, vec!["A"]);
    }

    #[test]
    fn io_errors_are_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = map_redis_err(RedisError::from(io));
        assert!(matches!(err, ZapkeepError::BackendUnavailable { .. }));
    }

    #[test]
    fn auth_failure_is_unavailable() {
        let err = map_redis_err(RedisError::from((
            redis::ErrorKind::AuthenticationFailed,
            "bad password",
        )));
        assert!(err.is_retryable());
    }

    #[test]
    fn type_errors_are_storage() {
        let err = map_redis_err(RedisError::from((redis::ErrorKind::TypeError, "wrong type")));
        assert!(matches!(err, ZapkeepError::Storage { .. }));
    }
}

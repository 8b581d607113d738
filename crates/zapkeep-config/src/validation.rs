// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints that serde attributes cannot express:
//! non-empty addresses, positive capacities, coherent backoff bounds, and
//! the descriptors each selected backend needs.

use crate::diagnostic::ConfigError;
use crate::model::{TokenStoreType, ZapkeepConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ZapkeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let server = &config.server;
    if server.host.trim().is_empty() {
        fail("server.host must not be empty".to_string());
    }
    if server.port == 0 {
        fail("server.port must be non-zero".to_string());
    }
    if server.max_listeners == 0 {
        fail("server.max_listeners must be at least 1".to_string());
    }

    let webhook = &config.webhook;
    if let Some(url) = &webhook.url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!("webhook.url `{url}` must start with http:// or https://"));
    }
    if webhook.max_attempts == 0 {
        fail("webhook.max_attempts must be at least 1".to_string());
    }
    if webhook.concurrency == 0 {
        fail("webhook.concurrency must be at least 1".to_string());
    }
    if webhook.initial_backoff_ms > webhook.max_backoff_ms {
        fail(format!(
            "webhook.initial_backoff_ms ({}) must not exceed webhook.max_backoff_ms ({})",
            webhook.initial_backoff_ms, webhook.max_backoff_ms
        ));
    }
    if webhook.timeout_secs == 0 {
        fail("webhook.timeout_secs must be at least 1".to_string());
    }

    let websocket = &config.websocket;
    if websocket.queue_capacity == 0 {
        fail("websocket.queue_capacity must be at least 1".to_string());
    }
    if websocket.concurrency == 0 {
        fail("websocket.concurrency must be at least 1".to_string());
    }

    if config.archive.enable {
        if config.archive.wait_time == 0 {
            fail("archive.wait_time must be positive when archiving is enabled".to_string());
        }
        if config.archive.days_to_archive == 0 {
            fail("archive.days_to_archive must be positive when archiving is enabled".to_string());
        }
    }

    if config.mapper.enable && config.mapper.prefix.is_empty() {
        fail("mapper.prefix must not be empty when the mapper is enabled".to_string());
    }

    match config.session.token_store {
        TokenStoreType::File => {
            if config.session.token_dir.trim().is_empty() {
                fail("session.token_dir must not be empty for the file token store".to_string());
            }
        }
        TokenStoreType::Redis => {
            if config.db.redis_host.trim().is_empty() {
                fail("db.redis_host must not be empty for the redis token store".to_string());
            }
        }
        TokenStoreType::Mongodb => {
            let db = &config.db;
            if db.mongo_is_remote && db.mongo_url_remote.as_deref().is_none_or(str::is_empty) {
                fail(
                    "db.mongo_url_remote is required when db.mongo_is_remote is true".to_string(),
                );
            }
            if !db.mongo_is_remote && db.mongodb_host.as_deref().is_none_or(str::is_empty) {
                fail(
                    "db.mongodb_host is required when db.mongo_is_remote is false".to_string(),
                );
            }
        }
    }

    if (webhook.upload_s3 || websocket.upload_s3)
        && config.aws_s3.default_bucket_name.as_deref().is_none_or(str::is_empty)
    {
        fail("aws_s3.default_bucket_name is required when upload_s3 is enabled".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./zapkeep.toml` > `~/.config/zapkeep/zapkeep.toml` > `/etc/zapkeep/zapkeep.toml`
//! with environment variable overrides via `ZAPKEEP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ZapkeepConfig;

/// Top-level sections recognised by the env provider.
const SECTIONS: &[&str] = &[
    "server", "session", "webhook", "websocket", "archive", "mapper", "db", "aws_s3", "log",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/zapkeep/zapkeep.toml` (system-wide)
/// 3. `~/.config/zapkeep/zapkeep.toml` (user XDG config)
/// 4. `./zapkeep.toml` (local directory)
/// 5. `ZAPKEEP_*` environment variables
pub fn load_config() -> Result<ZapkeepConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ZapkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapkeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ZapkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapkeepConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ZapkeepConfig::default()))
        .merge(Toml::file("/etc/zapkeep/zapkeep.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("zapkeep/zapkeep.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("zapkeep.toml"))
        .merge(env_provider())
}

/// Maps `ZAPKEEP_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `ZAPKEEP_WEBHOOK_LISTEN_ACKS` must become
/// `webhook.listen_acks`, not `webhook.listen.acks`.
fn env_provider() -> Env {
    Env::prefixed("ZAPKEEP_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("webhook_listen_acks"), "webhook.listen_acks");
        assert_eq!(map_env_key("websocket_auto_download"), "websocket.auto_download");
        assert_eq!(map_env_key("db_redis_db"), "db.redis_db");
        assert_eq!(map_env_key("aws_s3_default_bucket_name"), "aws_s3.default_bucket_name");
        assert_eq!(map_env_key("session_token_store"), "session.token_store");
        assert_eq!(map_env_key("unknown"), "unknown");
    }

    #[test]
    fn string_overrides_defaults() {
        let config = load_config_from_str("[archive]\nenable = true\n").unwrap();
        assert!(config.archive.enable);
        assert_eq!(config.archive.wait_time, 10);
    }
}

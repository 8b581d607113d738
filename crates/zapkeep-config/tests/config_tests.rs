// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the zapkeep configuration system.

use std::io::Write;

use figment::Figment;
use serial_test::serial;
use figment::providers::{Format, Serialized, Toml};
use zapkeep_config::diagnostic::ConfigError;
use zapkeep_config::model::{LogLevel, TokenStoreType, ZapkeepConfig};
use zapkeep_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

/// Every section populated deserializes into the expected values.
#[test]
fn full_toml_deserializes_into_zapkeep_config() {
    let toml = r#"
[server]
host = "0.0.0.0"
port = 8080
secret_key = "s3cret"
max_listeners = 3

[session]
start_all_session = false
token_store = "redis"

[webhook]
url = "https://hooks.example.com/wa"
listen_acks = false
on_poll_response = false
ignore = ["status@broadcast", "999@c.us"]

[websocket]
auto_download = true
queue_capacity = 16

[archive]
enable = true
wait_time = 30
days_to_archive = 7

[mapper]
enable = true
prefix = "crm-"

[db]
redis_host = "cache"
redis_prefix = "prod"

[log]
level = "verbose"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.secret_key.as_deref(), Some("s3cret"));
    assert_eq!(config.server.max_listeners, 3);
    assert!(!config.session.start_all_session);
    assert_eq!(config.session.token_store, TokenStoreType::Redis);
    assert!(!config.webhook.listen_acks);
    assert!(!config.webhook.on_poll_response);
    assert!(config.webhook.on_reaction_message);
    assert_eq!(config.webhook.ignore.len(), 2);
    assert!(config.websocket.auto_download);
    assert_eq!(config.websocket.queue_capacity, 16);
    assert!(config.archive.enable);
    assert_eq!(config.archive.days_to_archive, 7);
    assert_eq!(config.mapper.prefix, "crm-");
    assert_eq!(config.db.redis_host, "cache");
    assert_eq!(config.log.level, LogLevel::Verbose);
}

/// Missing sections fall back to compiled defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("[server]\nport = 9000\n").unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.host, "127.0.0.1");
    assert!(config.session.start_all_session);
    assert_eq!(config.webhook.max_attempts, 5);
    assert!(config.websocket.enabled);
}

/// A typo in a key surfaces as UnknownKey with a suggestion.
#[test]
fn typo_in_webhook_key_suggests_correction() {
    let errors = load_and_validate_str("[webhook]\nlisten_akcs = false\n")
        .expect_err("unknown key must be rejected");
    let suggestion = errors.iter().find_map(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } if key == "listen_akcs" => suggestion.clone(),
        _ => None,
    });
    assert_eq!(suggestion.as_deref(), Some("listen_acks"));
}

/// An unknown token store is rejected rather than silently defaulted.
#[test]
fn unknown_token_store_is_rejected() {
    let errors = load_and_validate_str("[session]\ntoken_store = \"postgres\"\n")
        .expect_err("unknown backend must be rejected");
    assert!(!errors.is_empty());
}

/// Validation errors come back after a clean deserialization.
#[test]
fn semantic_errors_are_reported() {
    let errors = load_and_validate_str("[server]\nmax_listeners = 0\n\n[websocket]\nqueue_capacity = 0\n")
        .expect_err("zero capacities are invalid");
    assert_eq!(errors.len(), 2);
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

/// Later providers override earlier ones, which is how env overrides behave.
#[test]
fn merged_override_wins_over_file() {
    let config: ZapkeepConfig = Figment::new()
        .merge(Serialized::defaults(ZapkeepConfig::default()))
        .merge(Toml::string("[webhook]\nauto_download = true\n"))
        .merge(("webhook.auto_download", false))
        .merge(("archive.enable", true))
        .extract()
        .unwrap();
    assert!(!config.webhook.auto_download);
    assert!(config.archive.enable);
}

/// Loading from an explicit path reads the file.
#[test]
fn load_from_path_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[mapper]\nenable = true\nprefix = \"x-\"").unwrap();
    let config = load_and_validate_path(file.path()).expect("valid file");
    assert!(config.mapper.enable);
    assert_eq!(config.mapper.prefix, "x-");
}

/// A missing explicit path is an error, not a silent default.
#[test]
fn load_from_missing_path_fails() {
    let dir = tempfile::tempdir().unwrap();
    let errors = load_and_validate_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(errors[0], ConfigError::Other(_)));
}

/// `ZAPKEEP_<SECTION>_<KEY>` overrides the file.
#[test]
#[serial]
fn env_var_overrides_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[webhook]\nlisten_acks = true\n[db]\nredis_db = 1").unwrap();

    // SAFETY: serialized with every other env-touching test.
    unsafe {
        std::env::set_var("ZAPKEEP_WEBHOOK_LISTEN_ACKS", "false");
        std::env::set_var("ZAPKEEP_DB_REDIS_DB", "4");
    }
    let loaded = load_and_validate_path(file.path());
    unsafe {
        std::env::remove_var("ZAPKEEP_WEBHOOK_LISTEN_ACKS");
        std::env::remove_var("ZAPKEEP_DB_REDIS_DB");
    }

    let config = loaded.expect("valid config");
    assert!(!config.webhook.listen_acks);
    assert_eq!(config.db.redis_db, 4);
}

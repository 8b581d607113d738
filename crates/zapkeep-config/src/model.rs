// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the zapkeep session server.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level zapkeep configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ZapkeepConfig {
    /// Listener, identity and auth settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Session persistence and startup behaviour.
    #[serde(default)]
    pub session: SessionConfig,

    /// Outbound HTTP callback settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Websocket broadcast settings.
    #[serde(default)]
    pub websocket: WebsocketConfig,

    /// Automatic conversation archiving.
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Label prefixing.
    #[serde(default)]
    pub mapper: MapperConfig,

    /// Redis and MongoDB connection descriptors.
    #[serde(default)]
    pub db: DbConfig,

    /// Object-storage descriptor for media uploads.
    #[serde(default)]
    pub aws_s3: AwsS3Config,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
}

/// Listener, identity and auth configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the gateway binds to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the ingest and admin routes. `None` rejects every
    /// authenticated request.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Device name presented by the WhatsApp client.
    #[serde(default = "default_device_name")]
    pub device_name: String,

    /// Value of the `X-Powered-By` response header.
    #[serde(default = "default_powered_by")]
    pub powered_by: String,

    /// Maximum number of concurrent websocket subscribers.
    #[serde(default = "default_max_listeners")]
    pub max_listeners: usize,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[redacted]"))
            .field("device_name", &self.device_name)
            .field("powered_by", &self.powered_by)
            .field("max_listeners", &self.max_listeners)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secret_key: None,
            device_name: default_device_name(),
            powered_by: default_powered_by(),
            max_listeners: default_max_listeners(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    21465
}

fn default_device_name() -> String {
    "zapkeep".to_string()
}

fn default_powered_by() -> String {
    "zapkeep".to_string()
}

fn default_max_listeners() -> usize {
    15
}

/// Which backend persists session tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreType {
    /// Local directory, one file per session.
    #[default]
    File,
    /// Redis, for multi-instance deployments.
    Redis,
    /// MongoDB, for centralized persistence.
    Mongodb,
}

impl std::fmt::Display for TokenStoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStoreType::File => write!(f, "file"),
            TokenStoreType::Redis => write!(f, "redis"),
            TokenStoreType::Mongodb => write!(f, "mongodb"),
        }
    }
}

/// Session persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Restore every persisted session when the process starts.
    #[serde(default = "default_true")]
    pub start_all_session: bool,

    #[serde(default)]
    pub token_store: TokenStoreType,

    /// Directory used by the `file` token store.
    #[serde(default = "default_token_dir")]
    pub token_dir: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_all_session: true,
            token_store: TokenStoreType::default(),
            token_dir: default_token_dir(),
        }
    }
}

fn default_token_dir() -> String {
    "./tokens".to_string()
}

fn default_true() -> bool {
    true
}

/// Webhook delivery configuration.
///
/// Per-kind flags gate the webhook channel only. `ignore` and
/// `suppress_self_messages` apply to every channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Callback URL. `None` disables the webhook channel.
    #[serde(default)]
    pub url: Option<String>,

    /// Download media before delivering.
    #[serde(default = "default_true")]
    pub auto_download: bool,

    /// Upload downloaded media to object storage and send the public link.
    #[serde(default)]
    pub upload_s3: bool,

    /// Mark chats as read after their messages are accepted.
    #[serde(default = "default_true")]
    pub read_message: bool,

    /// Replay unread messages through the pipeline after a session is restored.
    #[serde(default)]
    pub all_unread_on_start: bool,

    #[serde(default = "default_true")]
    pub listen_acks: bool,

    #[serde(default = "default_true")]
    pub on_presence_changed: bool,

    #[serde(default = "default_true")]
    pub on_participants_changed: bool,

    #[serde(default = "default_true")]
    pub on_reaction_message: bool,

    #[serde(default = "default_true")]
    pub on_poll_response: bool,

    #[serde(default = "default_true")]
    pub on_revoked_message: bool,

    #[serde(default = "default_true")]
    pub on_label_updated: bool,

    /// Drop events authored by the session itself, on every channel.
    #[serde(default)]
    pub suppress_self_messages: bool,

    /// Sender JIDs that never produce notifications.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,

    /// Total delivery attempts per event, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Maximum in-flight webhook deliveries.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            auto_download: true,
            upload_s3: false,
            read_message: true,
            all_unread_on_start: false,
            listen_acks: true,
            on_presence_changed: true,
            on_participants_changed: true,
            on_reaction_message: true,
            on_poll_response: true,
            on_revoked_message: true,
            on_label_updated: true,
            suppress_self_messages: false,
            ignore: default_ignore(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            concurrency: default_concurrency(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_ignore() -> Vec<String> {
    vec!["status@broadcast".to_string()]
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_concurrency() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    15
}

/// Websocket broadcast configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebsocketConfig {
    /// Enable the websocket channel.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub auto_download: bool,

    #[serde(default)]
    pub upload_s3: bool,

    /// Outbound queue length per subscriber; the oldest message is dropped on overflow.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Maximum in-flight websocket deliveries (media resolution included).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for WebsocketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_download: false,
            upload_s3: false,
            queue_capacity: default_queue_capacity(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_queue_capacity() -> usize {
    64
}

/// Automatic archiving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub enable: bool,

    /// Seconds without activity before a conversation becomes pending.
    #[serde(default = "default_wait_time")]
    pub wait_time: u64,

    /// Days without activity before a conversation is archived.
    #[serde(default = "default_days_to_archive")]
    pub days_to_archive: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enable: false,
            wait_time: default_wait_time(),
            days_to_archive: default_days_to_archive(),
        }
    }
}

fn default_wait_time() -> u64 {
    10
}

fn default_days_to_archive() -> u32 {
    45
}

/// Label mapper configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MapperConfig {
    #[serde(default)]
    pub enable: bool,

    #[serde(default = "default_mapper_prefix")]
    pub prefix: String,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            enable: false,
            prefix: default_mapper_prefix(),
        }
    }
}

fn default_mapper_prefix() -> String {
    "tagone-".to_string()
}

/// Redis and MongoDB connection descriptors.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DbConfig {
    #[serde(default = "default_mongodb_database")]
    pub mongodb_database: String,

    /// Collection name. `None` uses `sessions`.
    #[serde(default)]
    pub mongodb_collection: Option<String>,

    #[serde(default)]
    pub mongodb_user: Option<String>,

    #[serde(default)]
    pub mongodb_password: Option<String>,

    #[serde(default)]
    pub mongodb_host: Option<String>,

    #[serde(default = "default_mongodb_port")]
    pub mongodb_port: u16,

    /// Use `mongo_url_remote` verbatim instead of host/port/credentials.
    #[serde(default = "default_true")]
    pub mongo_is_remote: bool,

    #[serde(default)]
    pub mongo_url_remote: Option<String>,

    #[serde(default = "default_redis_host")]
    pub redis_host: String,

    #[serde(default = "default_redis_port")]
    pub redis_port: u16,

    #[serde(default)]
    pub redis_password: Option<String>,

    #[serde(default)]
    pub redis_db: u32,

    /// Prefix prepended to every Redis key.
    #[serde(default = "default_redis_prefix")]
    pub redis_prefix: String,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("mongodb_database", &self.mongodb_database)
            .field("mongodb_collection", &self.mongodb_collection)
            .field("mongodb_user", &self.mongodb_user)
            .field(
                "mongodb_password",
                &self.mongodb_password.as_ref().map(|_| "[redacted]"),
            )
            .field("mongodb_host", &self.mongodb_host)
            .field("mongodb_port", &self.mongodb_port)
            .field("mongo_is_remote", &self.mongo_is_remote)
            .field(
                "mongo_url_remote",
                &self.mongo_url_remote.as_ref().map(|_| "[redacted]"),
            )
            .field("redis_host", &self.redis_host)
            .field("redis_port", &self.redis_port)
            .field(
                "redis_password",
                &self.redis_password.as_ref().map(|_| "[redacted]"),
            )
            .field("redis_db", &self.redis_db)
            .field("redis_prefix", &self.redis_prefix)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            mongodb_database: default_mongodb_database(),
            mongodb_collection: None,
            mongodb_user: None,
            mongodb_password: None,
            mongodb_host: None,
            mongodb_port: default_mongodb_port(),
            mongo_is_remote: true,
            mongo_url_remote: None,
            redis_host: default_redis_host(),
            redis_port: default_redis_port(),
            redis_password: None,
            redis_db: 0,
            redis_prefix: default_redis_prefix(),
        }
    }
}

fn default_mongodb_database() -> String {
    "tokens".to_string()
}

fn default_mongodb_port() -> u16 {
    27017
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_prefix() -> String {
    "docker".to_string()
}

/// Object-storage descriptor for media uploads.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AwsS3Config {
    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub default_bucket_name: Option<String>,

    /// Custom endpoint for S3-compatible stores (MinIO, Wasabi, ...).
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub force_path_style: bool,
}

impl std::fmt::Debug for AwsS3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsS3Config")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[redacted]"))
            .field("default_bucket_name", &self.default_bucket_name)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl Default for AwsS3Config {
    fn default() -> Self {
        Self {
            region: default_region(),
            access_key_id: None,
            secret_key: None,
            default_bucket_name: None,
            endpoint: None,
            force_path_style: false,
        }
    }
}

fn default_region() -> String {
    "sa-east-1".to_string()
}

/// Log verbosity, using the level names of the original server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    /// Maps to `debug`.
    Verbose,
    Debug,
    /// Maps to `trace`.
    Silly,
}

impl LogLevel {
    /// The equivalent `tracing` level directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Verbose | LogLevel::Debug => "debug",
            LogLevel::Silly => "trace",
        }
    }
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Console,
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default = "default_logger")]
    pub logger: Vec<LogTarget>,

    /// Log file used when `logger` contains `file`.
    #[serde(default = "default_log_file")]
    pub file_path: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            logger: default_logger(),
            file_path: default_log_file(),
        }
    }
}

fn default_logger() -> Vec<LogTarget> {
    vec![LogTarget::Console]
}

fn default_log_file() -> String {
    "./log/zapkeep.log".to_string()
}

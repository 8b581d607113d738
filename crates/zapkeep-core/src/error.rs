// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the zapkeep session server.

use thiserror::Error;

/// Boxed error source carried by the wrapping variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The primary error type used across store backends, the registry,
/// and the dispatch pipeline.
#[derive(Debug, Error)]
pub enum ZapkeepError {
    /// Configuration errors (invalid values, missing descriptors).
    #[error("configuration error: {0}")]
    Config(String),

    /// A store backend could not be reached or rejected our credentials.
    ///
    /// Transient: callers decide whether and when to retry.
    #[error("{backend} backend unavailable: {source}")]
    BackendUnavailable { backend: String, source: BoxError },

    /// The requested key does not exist.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// A session with this key already exists.
    #[error("already exists: {key}")]
    AlreadyExists { key: String },

    /// A store key failed validation.
    #[error("invalid key `{key}`: {reason}")]
    InvalidKey { key: String, reason: String },

    /// A persisted entry could not be decoded.
    #[error("corrupt entry {key}: {source}")]
    CorruptEntry { key: String, source: BoxError },

    /// Any other storage failure (I/O, serialization, query error).
    #[error("storage error: {source}")]
    Storage { source: BoxError },

    /// Webhook delivery gave up after exhausting its retry budget.
    #[error("delivery to {channel} failed after {attempts} attempt(s): {message}")]
    DeliveryFailed {
        channel: String,
        attempts: u32,
        message: String,
    },

    /// Media could not be downloaded or uploaded.
    #[error("media fetch failed: {message}")]
    MediaFetchFailed {
        message: String,
        source: Option<BoxError>,
    },

    /// The websocket listener ceiling has been reached.
    #[error("subscriber limit of {limit} reached")]
    SubscriberLimit { limit: usize },

    /// The operation was aborted by the shutdown signal.
    #[error("operation cancelled by shutdown")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ZapkeepError {
    /// Wraps an arbitrary error as a generic storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Wraps a connectivity failure for the named backend.
    pub fn unavailable<E>(backend: &str, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::BackendUnavailable {
            backend: backend.to_string(),
            source: Box::new(err),
        }
    }

    /// Returns `true` for transient conditions a caller may retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::DeliveryFailed { .. }
        )
    }

    /// Returns `true` if this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

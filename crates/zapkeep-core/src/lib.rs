// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the zapkeep session server.
//!
//! This crate provides the error taxonomy, the domain types (runtime
//! events, session tokens, conversation keys), and the traits that sit at
//! the seams between the store, the dispatch pipeline, and the external
//! automation layer.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ZapkeepError;
pub use types::{
    ConversationKey, EventKind, HealthStatus, MediaRef, RuntimeEvent, SessionToken,
};

pub use traits::{
    ChatControl, MediaBlob, MediaFetcher, ObjectStorage, StoreBackend, UploadTarget,
};

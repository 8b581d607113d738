// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for zapkeep integration tests.
//!
//! Provides in-memory collaborators for fast, deterministic, CI-runnable
//! tests without Redis, MongoDB, or a browser session.
//!
//! # Components
//!
//! - [`MemoryStore`] - `StoreBackend` over a map, with outage simulation
//! - [`RecordingChatControl`] - captures mark-read and archive calls
//! - [`StaticMediaFetcher`] / [`RecordingObjectStorage`] - canned media I/O
//! - [`fixtures`] - ready-made runtime events

pub mod fixtures;
pub mod memory_store;
pub mod mock_control;
pub mod mock_media;

pub use memory_store::MemoryStore;
pub use mock_control::RecordingChatControl;
pub use mock_media::{RecordingObjectStorage, StaticMediaFetcher};

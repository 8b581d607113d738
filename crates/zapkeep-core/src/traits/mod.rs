// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions at the seams of the zapkeep server.
//!
//! [`StoreBackend`] is implemented by the store crate. [`MediaFetcher`],
//! [`ObjectStorage`], and [`ChatControl`] are the contracts the dispatch
//! core requires from external collaborators. All use `#[async_trait]`
//! for dynamic dispatch compatibility.

pub mod control;
pub mod media;
pub mod store;

pub use control::ChatControl;
pub use media::{MediaBlob, MediaFetcher, ObjectStorage, UploadTarget};
pub use store::StoreBackend;

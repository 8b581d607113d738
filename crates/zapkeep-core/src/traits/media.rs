// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media download and object-storage upload contracts.

use async_trait::async_trait;

use crate::error::ZapkeepError;
use crate::types::MediaRef;

/// Raw media bytes resolved from a [`MediaRef`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub data: Vec<u8>,
    pub mimetype: String,
    pub filename: Option<String>,
}

/// Downloads the bytes behind a media reference.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, session: &str, media: &MediaRef) -> Result<MediaBlob, ZapkeepError>;
}

/// Where an upload should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
    pub force_path_style: bool,
}

/// Uploads a media blob and returns its public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        blob: &MediaBlob,
        object_key: &str,
        target: &UploadTarget,
    ) -> Result<String, ZapkeepError>;
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canned media collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use zapkeep_core::{
    MediaBlob, MediaFetcher, MediaRef, ObjectStorage, UploadTarget, ZapkeepError,
};

/// Returns the same blob for every fetch, or fails every fetch.
pub struct StaticMediaFetcher {
    blob: Option<MediaBlob>,
    calls: AtomicUsize,
}

impl StaticMediaFetcher {
    pub fn returning(data: &[u8], mimetype: &str) -> Self {
        Self {
            blob: Some(MediaBlob {
                data: data.to_vec(),
                mimetype: mimetype.to_string(),
                filename: None,
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            blob: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for StaticMediaFetcher {
    async fn fetch(&self, _session: &str, media: &MediaRef) -> Result<MediaBlob, ZapkeepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.blob
            .clone()
            .ok_or_else(|| ZapkeepError::MediaFetchFailed {
                message: format!("no media for {}", media.id),
                source: None,
            })
    }
}

/// Records uploads and returns `https://<bucket>.example/<key>`.
#[derive(Default)]
pub struct RecordingObjectStorage {
    uploads: Mutex<Vec<(String, UploadTarget)>>,
}

impl RecordingObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn uploads(&self) -> Vec<(String, UploadTarget)> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStorage for RecordingObjectStorage {
    async fn upload(
        &self,
        _blob: &MediaBlob,
        object_key: &str,
        target: &UploadTarget,
    ) -> Result<String, ZapkeepError> {
        self.uploads
            .lock()
            .await
            .push((object_key.to_string(), target.clone()));
        Ok(format!("https://{}.example/{object_key}", target.bucket))
    }
}

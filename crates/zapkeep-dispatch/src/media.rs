// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media resolution for outgoing envelopes.
//!
//! Downloads the attachment through a [`MediaFetcher`], then either uploads
//! it to object storage (envelope carries the public URL) or inlines the
//! bytes as base64. Any failure degrades to `media_error: true`; the event
//! is still delivered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use zapkeep_config::model::AwsS3Config;
use zapkeep_core::{
    MediaBlob, MediaFetcher, MediaRef, ObjectStorage, RuntimeEvent, UploadTarget, ZapkeepError,
};

use crate::envelope::{MediaOutcome, MediaPayload};
use crate::filter::MediaPlan;

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

/// Upload target from the `aws_s3` section, if a bucket is configured.
pub fn upload_target(config: &AwsS3Config) -> Option<UploadTarget> {
    let bucket = config.default_bucket_name.clone().filter(|b| !b.is_empty())?;
    Some(UploadTarget {
        region: config.region.clone(),
        bucket,
        endpoint: config.endpoint.clone(),
        force_path_style: config.force_path_style,
    })
}

/// Object key for an uploaded attachment: `<session>/<media id>.<ext>`.
pub fn object_key(session: &str, media_id: &str, mimetype: &str) -> String {
    let subtype = mimetype
        .split(';')
        .next()
        .and_then(|essence| essence.split('/').nth(1))
        .map(str::trim)
        .filter(|s| !s.is_empty());
    match subtype {
        Some(ext) => format!("{session}/{media_id}.{ext}"),
        None => format!("{session}/{media_id}"),
    }
}

#[derive(Clone, Default)]
pub struct MediaResolver {
    fetcher: Option<Arc<dyn MediaFetcher>>,
    storage: Option<Arc<dyn ObjectStorage>>,
    target: Option<UploadTarget>,
}

impl MediaResolver {
    pub fn new(
        fetcher: Option<Arc<dyn MediaFetcher>>,
        storage: Option<Arc<dyn ObjectStorage>>,
        target: Option<UploadTarget>,
    ) -> Self {
        Self {
            fetcher,
            storage,
            target,
        }
    }

    /// Resolves the event's media according to one channel's plan.
    pub async fn resolve(&self, event: &RuntimeEvent, plan: MediaPlan) -> MediaOutcome {
        let Some(media) = event.media.as_ref().filter(|_| plan.fetch) else {
            return MediaOutcome::Skipped;
        };

        match self.try_resolve(event, media, plan.upload).await {
            Ok(payload) => MediaOutcome::Resolved(payload),
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    media_id = %media.id,
                    error = %e,
                    "media resolution failed, delivering without media"
                );
                metrics::counter!("zapkeep_media_failures_total").increment(1);
                MediaOutcome::Failed
            }
        }
    }

    async fn try_resolve(
        &self,
        event: &RuntimeEvent,
        media: &MediaRef,
        upload: bool,
    ) -> Result<MediaPayload, ZapkeepError> {
        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or_else(|| ZapkeepError::MediaFetchFailed {
                message: "no media fetcher configured".to_string(),
                source: None,
            })?;
        let blob = fetcher.fetch(&event.session, media).await?;
        debug!(media_id = %media.id, bytes = blob.data.len(), "media downloaded");

        let filename = blob.filename.clone().or_else(|| media.filename.clone());
        if upload {
            let url = self.upload(event, media, &blob).await?;
            return Ok(MediaPayload {
                id: media.id.clone(),
                mimetype: blob.mimetype,
                filename,
                url: Some(url),
                base64: None,
            });
        }

        Ok(MediaPayload {
            id: media.id.clone(),
            base64: Some(STANDARD.encode(&blob.data)),
            mimetype: blob.mimetype,
            filename,
            url: None,
        })
    }

    async fn upload(
        &self,
        event: &RuntimeEvent,
        media: &MediaRef,
        blob: &MediaBlob,
    ) -> Result<String, ZapkeepError> {
        let (Some(storage), Some(target)) = (&self.storage, &self.target) else {
            return Err(ZapkeepError::MediaFetchFailed {
                message: "upload requested but no object storage is configured".to_string(),
                source: None,
            });
        };
        let key = object_key(&event.session, &media.id, &blob.mimetype);
        storage.upload(blob, &key, target).await
    }
}

/// Downloads media from the URL the automation layer attached to the event.
pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ZapkeepError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ZapkeepError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn fetch_failed(message: String, err: reqwest::Error) -> ZapkeepError {
    ZapkeepError::MediaFetchFailed {
        message,
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, _session: &str, media: &MediaRef) -> Result<MediaBlob, ZapkeepError> {
        let url = media
            .url
            .as_deref()
            .ok_or_else(|| ZapkeepError::MediaFetchFailed {
                message: format!("media {} has no download url", media.id),
                source: None,
            })?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_failed(format!("download of {} failed: {e}", media.id), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZapkeepError::MediaFetchFailed {
                message: format!("download of {} returned {status}", media.id),
                source: None,
            });
        }

        let header_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let data = response
            .bytes()
            .await
            .map_err(|e| fetch_failed(format!("reading {} failed: {e}", media.id), e))?;

        Ok(MediaBlob {
            data: data.to_vec(),
            mimetype: media
                .mimetype
                .clone()
                .or(header_type)
                .unwrap_or_else(|| FALLBACK_MIMETYPE.to_string()),
            filename: media.filename.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zapkeep_core::EventKind;
    use zapkeep_test_utils::{RecordingObjectStorage, StaticMediaFetcher};

    fn media_event(url: &str) -> RuntimeEvent {
        RuntimeEvent::new(EventKind::Message, "A", "123@c.us")
            .with_id("e1")
            .with_media(MediaRef {
                id: "m1".into(),
                mimetype: Some("image/png".into()),
                url: Some(url.into()),
                filename: None,
            })
    }

    const FETCH: MediaPlan = MediaPlan {
        fetch: true,
        upload: false,
    };

    #[test]
    fn object_key_uses_subtype() {
        assert_eq!(object_key("A", "m1", "image/jpeg"), "A/m1.jpeg");
        assert_eq!(object_key("A", "m1", "audio/ogg; codecs=opus"), "A/m1.ogg");
        assert_eq!(object_key("A", "m1", "garbage"), "A/m1");
    }

    #[test]
    fn upload_target_requires_bucket() {
        assert!(upload_target(&AwsS3Config::default()).is_none());
        let config = AwsS3Config {
            default_bucket_name: Some("media".into()),
            ..AwsS3Config::default()
        };
        assert_eq!(upload_target(&config).unwrap().bucket, "media");
    }

    #[tokio::test]
    async fn skipped_when_plan_does_not_fetch() {
        let fetcher = Arc::new(StaticMediaFetcher::returning(b"png", "image/png"));
        let resolver = MediaResolver::new(Some(fetcher.clone()), None, None);
        let outcome = resolver
            .resolve(&media_event("http://x"), MediaPlan::default())
            .await;
        assert_eq!(outcome, MediaOutcome::Skipped);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn inlines_base64_without_upload() {
        let fetcher = Arc::new(StaticMediaFetcher::returning(&[0, 1, 2], "image/png"));
        let resolver = MediaResolver::new(Some(fetcher), None, None);
        match resolver.resolve(&media_event("http://x"), FETCH).await {
            MediaOutcome::Resolved(payload) => {
                assert_eq!(payload.base64.as_deref(), Some("AAEC"));
                assert!(payload.url.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn uploads_when_requested() {
        let fetcher = Arc::new(StaticMediaFetcher::returning(b"png", "image/png"));
        let storage = Arc::new(RecordingObjectStorage::new());
        let target = UploadTarget {
            region: "sa-east-1".into(),
            bucket: "media".into(),
            endpoint: None,
            force_path_style: false,
        };
        let resolver = MediaResolver::new(Some(fetcher), Some(storage.clone()), Some(target));
        let plan = MediaPlan {
            fetch: true,
            upload: true,
        };
        match resolver.resolve(&media_event("http://x"), plan).await {
            MediaOutcome::Resolved(payload) => {
                assert_eq!(payload.url.as_deref(), Some("https://media.example/A/m1.png"));
                assert!(payload.base64.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(storage.uploads().await.len(), 1);
    }

    #[tokio::test]
    async fn upload_without_storage_fails_softly() {
        let fetcher = Arc::new(StaticMediaFetcher::returning(b"png", "image/png"));
        let resolver = MediaResolver::new(Some(fetcher), None, None);
        let plan = MediaPlan {
            fetch: true,
            upload: true,
        };
        assert_eq!(
            resolver.resolve(&media_event("http://x"), plan).await,
            MediaOutcome::Failed
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_soft() {
        let resolver = MediaResolver::new(Some(Arc::new(StaticMediaFetcher::failing())), None, None);
        assert_eq!(
            resolver.resolve(&media_event("http://x"), FETCH).await,
            MediaOutcome::Failed
        );
    }

    #[tokio::test]
    async fn http_fetcher_downloads_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/m1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/webp")
                    .set_body_bytes(vec![7u8, 8, 9]),
            )
            .mount(&server)
            .await;

        let fetcher = HttpMediaFetcher::new(Duration::from_secs(5)).unwrap();
        let media = MediaRef {
            id: "m1".into(),
            mimetype: None,
            url: Some(format!("{}/m1", server.uri())),
            filename: None,
        };
        let blob = fetcher.fetch("A", &media).await.unwrap();
        assert_eq!(blob.data, vec![7, 8, 9]);
        assert_eq!(blob.mimetype, "image/webp");
    }

    #[tokio::test]
    async fn http_fetcher_rejects_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpMediaFetcher::new(Duration::from_secs(5)).unwrap();
        let media = MediaRef {
            id: "m1".into(),
            mimetype: None,
            url: Some(format!("{}/gone", server.uri())),
            filename: None,
        };
        let err = fetcher.fetch("A", &media).await.unwrap_err();
        assert!(matches!(err, ZapkeepError::MediaFetchFailed { .. }));
    }
}

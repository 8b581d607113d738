// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP callback channel.
//!
//! POSTs the JSON envelope to the configured URL. Any non-2xx status or
//! transport error is retried with exponential backoff until the attempt
//! budget runs out. Backoff sleeps are cut short by shutdown.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use zapkeep_config::model::WebhookConfig;
use zapkeep_core::ZapkeepError;

use crate::envelope::Envelope;
use crate::worker::DeliveryChannel;

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &WebhookConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    /// Delay after the `failed`-th failed attempt (1-based): `initial * 2^(failed-1)`, capped.
    pub fn backoff(&self, failed: u32) -> Duration {
        let exp = failed.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&WebhookConfig::default())
    }
}

pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl WebhookChannel {
    pub fn new(
        url: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<Self, ZapkeepError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ZapkeepError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            retry,
            cancel,
        })
    }

    /// Builds the channel from the `webhook` section. `None` when no URL is set.
    pub fn from_config(
        config: &WebhookConfig,
        cancel: CancellationToken,
    ) -> Result<Option<Self>, ZapkeepError> {
        let Some(url) = config.url.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(None);
        };
        Self::new(
            url,
            RetryPolicy::from_config(config),
            Duration::from_secs(config.timeout_secs),
            cancel,
        )
        .map(Some)
    }

    async fn post_once(&self, envelope: &Envelope) -> Result<(), String> {
        let response = self
            .client
            .post(&self.url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(format!("endpoint returned {status}: {body}"))
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), ZapkeepError> {
        let mut last_error = String::new();

        for attempt in 1..=self.retry.max_attempts {
            match self.post_once(envelope).await {
                Ok(()) => {
                    debug!(event_id = %envelope.id, attempt, "webhook delivered");
                    return Ok(());
                }
                Err(e) => last_error = e,
            }

            if attempt == self.retry.max_attempts {
                break;
            }
            let delay = self.retry.backoff(attempt);
            warn!(
                event_id = %envelope.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "webhook delivery failed, will retry"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ZapkeepError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Err(ZapkeepError::DeliveryFailed {
            channel: "webhook".to_string(),
            attempts: self.retry.max_attempts,
            message: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::MediaOutcome;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use zapkeep_core::{EventKind, RuntimeEvent};

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    fn channel(server: &MockServer, retry: RetryPolicy) -> WebhookChannel {
        WebhookChannel::new(
            format!("{}/hook", server.uri()),
            retry,
            Duration::from_secs(5),
            CancellationToken::new(),
        )
        .unwrap()
    }

    fn envelope() -> Envelope {
        let event = RuntimeEvent::new(EventKind::Ack, "A", "123@c.us")
            .with_id("evt-1")
            .with_payload(json!({ "ack": 3 }));
        Envelope::new(&event, MediaOutcome::Skipped)
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(3_000),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(500));
        assert_eq!(policy.backoff(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff(4), Duration::from_millis(3_000));
        assert_eq!(policy.backoff(40), Duration::from_millis(3_000));
    }

    #[test]
    fn no_url_means_no_channel() {
        let channel = WebhookChannel::from_config(&WebhookConfig::default(), CancellationToken::new());
        assert!(channel.unwrap().is_none());
    }

    #[tokio::test]
    async fn posts_envelope_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({ "event": "ack", "id": "evt-1", "payload": { "ack": 3 } })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        channel(&server, fast_retry(3)).send(&envelope()).await.unwrap();
    }

    #[tokio::test]
    async fn retries_until_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        channel(&server, fast_retry(5)).send(&envelope()).await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let err = channel(&server, fast_retry(3))
            .send(&envelope())
            .await
            .unwrap_err();
        match err {
            ZapkeepError::DeliveryFailed {
                attempts, message, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("500"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_interrupts_backoff() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let cancel = CancellationToken::new();
        let slow = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(60),
            max_backoff: Duration::from_secs(60),
        };
        let channel = WebhookChannel::new(
            format!("{}/hook", server.uri()),
            slow,
            Duration::from_secs(5),
            cancel.clone(),
        )
        .unwrap();

        let handle = tokio::spawn(async move { channel.send(&envelope()).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ZapkeepError::Cancelled)));
    }
}

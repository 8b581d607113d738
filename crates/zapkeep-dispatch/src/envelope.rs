// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire envelope shared by the webhook and websocket channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zapkeep_core::{EventKind, RuntimeEvent};

/// Resolved media attached to an envelope.
///
/// Exactly one of `url` (uploaded to object storage) or `base64` (inline
/// bytes) is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub id: String,
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// Result of media resolution for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaOutcome {
    /// No media, or the channel does not download it.
    Skipped,
    Resolved(MediaPayload),
    /// Download or upload failed; delivery goes ahead without media.
    Failed,
}

/// JSON body posted to the webhook and pushed to websocket subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: EventKind,
    pub id: String,
    pub session: String,
    pub sender: String,
    pub chat: String,
    pub timestamp: DateTime<Utc>,
    pub media: Option<MediaPayload>,
    pub media_error: bool,
    pub labels: Vec<String>,
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Builds the envelope. `event.labels` must already be mapped.
    pub fn new(event: &RuntimeEvent, media: MediaOutcome) -> Self {
        let (media, media_error) = match media {
            MediaOutcome::Skipped => (None, false),
            MediaOutcome::Resolved(payload) => (Some(payload), false),
            MediaOutcome::Failed => (None, true),
        };
        Self {
            event: event.kind,
            id: event.id.clone(),
            session: event.session.clone(),
            sender: event.sender.clone(),
            chat: event.conversation().to_string(),
            timestamp: event.timestamp,
            media,
            media_error,
            labels: event.labels.clone(),
            payload: event.payload.clone(),
        }
    }
}

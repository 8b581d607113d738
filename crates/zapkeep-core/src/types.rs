// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the store, dispatch, and gateway crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend is fully operational.
    Healthy,
    /// Backend is operational but experiencing issues.
    Degraded(String),
    /// Backend is not operational.
    Unhealthy(String),
}

/// Kind of runtime event produced by the automation layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventKind {
    Message,
    Ack,
    PresenceChange,
    ParticipantsChange,
    Reaction,
    PollResponse,
    Revocation,
    LabelUpdate,
    QrCode,
    StatusChange,
}

impl EventKind {
    /// Every event kind, in declaration order.
    pub const ALL: [EventKind; 10] = [
        EventKind::Message,
        EventKind::Ack,
        EventKind::PresenceChange,
        EventKind::ParticipantsChange,
        EventKind::Reaction,
        EventKind::PollResponse,
        EventKind::Revocation,
        EventKind::LabelUpdate,
        EventKind::QrCode,
        EventKind::StatusChange,
    ];
}

/// Reference to a media attachment carried by an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Identifier assigned by the automation layer.
    pub id: String,
    /// MIME type, if known.
    #[serde(default)]
    pub mimetype: Option<String>,
    /// Download location for the raw bytes.
    #[serde(default)]
    pub url: Option<String>,
    /// Original file name, if any.
    #[serde(default)]
    pub filename: Option<String>,
}

/// One occurrence to evaluate for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    /// Event identifier. Assigned by the ingest point when empty.
    #[serde(default)]
    pub id: String,
    pub kind: EventKind,
    /// Name of the session that produced the event.
    pub session: String,
    /// JID of the author.
    pub sender: String,
    /// JID of the conversation. Falls back to `sender` when absent.
    #[serde(default)]
    pub chat: Option<String>,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Kind-specific fields (ack level, presence state, poll votes, ...).
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RuntimeEvent {
    /// Creates an event stamped with the current time and an empty payload.
    pub fn new(kind: EventKind, session: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind,
            session: session.into(),
            sender: sender.into(),
            chat: None,
            media: None,
            labels: Vec::new(),
            timestamp: Utc::now(),
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_chat(mut self, chat: impl Into<String>) -> Self {
        self.chat = Some(chat.into());
        self
    }

    pub fn with_media(mut self, media: MediaRef) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The conversation this event belongs to.
    pub fn conversation(&self) -> &str {
        self.chat.as_deref().unwrap_or(&self.sender)
    }

    /// Key used by the archive scheduler.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(&self.session, self.conversation())
    }
}

/// Identifies one conversation within one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationKey {
    pub session: String,
    pub chat: String,
}

impl ConversationKey {
    pub fn new(session: impl Into<String>, chat: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            chat: chat.into(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.session, self.chat)
    }
}

/// Persisted credentials for one WhatsApp session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Session name; unique key within a registry.
    pub name: String,
    /// Opaque credential blob, base64 encoded on the wire.
    #[serde(with = "blob")]
    pub credential: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// The session's own JID, once the automation layer has authenticated.
    #[serde(default)]
    pub self_jid: Option<String>,
}

impl SessionToken {
    pub fn new(name: impl Into<String>, credential: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            credential,
            created_at: now,
            last_seen: now,
            self_jid: None,
        }
    }
}

mod blob {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

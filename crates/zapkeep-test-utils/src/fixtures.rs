// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ready-made runtime events.

use serde_json::json;

use zapkeep_core::{EventKind, MediaRef, RuntimeEvent};

pub const SESSION: &str = "NERDWHATS_AMERICA";
pub const SELF_JID: &str = "5511900000000@c.us";
pub const CONTACT_JID: &str = "5511911111111@c.us";

/// Plain text message from a contact.
pub fn message(id: &str) -> RuntimeEvent {
    RuntimeEvent::new(EventKind::Message, SESSION, CONTACT_JID)
        .with_id(id)
        .with_payload(json!({ "body": "hello" }))
}

/// Reaction to an earlier message.
pub fn reaction(id: &str, emoji: &str) -> RuntimeEvent {
    RuntimeEvent::new(EventKind::Reaction, SESSION, CONTACT_JID)
        .with_id(id)
        .with_payload(json!({ "reaction": emoji, "msgId": "true_5511911111111@c.us_ABC" }))
}

/// Image message whose bytes live at `url`.
pub fn media_message(id: &str, url: &str) -> RuntimeEvent {
    RuntimeEvent::new(EventKind::Message, SESSION, CONTACT_JID)
        .with_id(id)
        .with_media(MediaRef {
            id: format!("media-{id}"),
            mimetype: Some("image/jpeg".to_string()),
            url: Some(url.to_string()),
            filename: Some("photo.jpg".to_string()),
        })
}

/// Event of any kind from `sender`.
pub fn event_from(kind: EventKind, sender: &str) -> RuntimeEvent {
    RuntimeEvent::new(kind, SESSION, sender).with_id(format!("{kind}-{sender}"))
}

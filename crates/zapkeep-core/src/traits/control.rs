// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Commands sent back to the automation layer that owns the WhatsApp client.

use async_trait::async_trait;

use crate::error::ZapkeepError;
use crate::types::RuntimeEvent;

/// Chat-level actions performed by the automation layer on our behalf.
#[async_trait]
pub trait ChatControl: Send + Sync {
    /// Marks every message in `chat` as read.
    async fn mark_read(&self, session: &str, chat: &str) -> Result<(), ZapkeepError>;

    /// Moves `chat` to the archived list.
    async fn archive_chat(&self, session: &str, chat: &str) -> Result<(), ZapkeepError>;

    /// Returns the unread messages of a session, oldest first.
    async fn unread_events(&self, session: &str) -> Result<Vec<RuntimeEvent>, ZapkeepError>;
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat control used when no automation layer is attached.

use async_trait::async_trait;
use tracing::info;

use zapkeep_core::{ChatControl, RuntimeEvent, ZapkeepError};

/// Logs every request and reports no unread messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingChatControl;

#[async_trait]
impl ChatControl for LoggingChatControl {
    async fn mark_read(&self, session: &str, chat: &str) -> Result<(), ZapkeepError> {
        info!(session, chat, "mark-read requested");
        Ok(())
    }

    async fn archive_chat(&self, session: &str, chat: &str) -> Result<(), ZapkeepError> {
        info!(session, chat, "archive requested");
        Ok(())
    }

    async fn unread_events(&self, _session: &str) -> Result<Vec<RuntimeEvent>, ZapkeepError> {
        Ok(Vec::new())
    }
}

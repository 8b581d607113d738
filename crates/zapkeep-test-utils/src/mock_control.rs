// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat-control collaborator that records calls.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use zapkeep_core::{ChatControl, RuntimeEvent, ZapkeepError};

/// Records every `mark_read` and `archive_chat` call as `(session, chat)`.
///
/// Unread events are served from a per-session map filled with
/// [`RecordingChatControl::with_unread`].
#[derive(Default)]
pub struct RecordingChatControl {
    read: Mutex<Vec<(String, String)>>,
    archived: Mutex<Vec<(String, String)>>,
    unread: Mutex<HashMap<String, Vec<RuntimeEvent>>>,
    notify: Notify,
}

impl RecordingChatControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_unread(self, session: &str, events: Vec<RuntimeEvent>) -> Self {
        self.unread.lock().await.insert(session.to_string(), events);
        self
    }

    pub async fn read_calls(&self) -> Vec<(String, String)> {
        self.read.lock().await.clone()
    }

    pub async fn archived_calls(&self) -> Vec<(String, String)> {
        self.archived.lock().await.clone()
    }

    /// Waits until at least `n` archive calls were recorded.
    pub async fn wait_for_archived(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.archived.lock().await.len() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl ChatControl for RecordingChatControl {
    async fn mark_read(&self, session: &str, chat: &str) -> Result<(), ZapkeepError> {
        self.read
            .lock()
            .await
            .push((session.to_string(), chat.to_string()));
        Ok(())
    }

    async fn archive_chat(&self, session: &str, chat: &str) -> Result<(), ZapkeepError> {
        self.archived
            .lock()
            .await
            .push((session.to_string(), chat.to_string()));
        self.notify.notify_waiters();
        Ok(())
    }

    async fn unread_events(&self, session: &str) -> Result<Vec<RuntimeEvent>, ZapkeepError> {
        Ok(self.unread.lock().await.remove(session).unwrap_or_default())
    }
}

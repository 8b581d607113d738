// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point for runtime events coming from the automation layer.
//!
//! Each submitted event is stamped, recorded as conversation activity,
//! run through [`decide`], and handed to the dispatcher. Delivery happens
//! on the channel workers; `submit` returns as soon as the work is queued.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use zapkeep_core::{ChatControl, EventKind, RuntimeEvent, ZapkeepError};
use zapkeep_store::SessionTokenRegistry;

use crate::archive::ArchivePolicyScheduler;
use crate::dispatcher::NotificationDispatcher;
use crate::filter::{Decision, FilterConfig, decide};

pub struct EventPipeline {
    filter: FilterConfig,
    registry: Arc<SessionTokenRegistry>,
    dispatcher: NotificationDispatcher,
    archive: Arc<ArchivePolicyScheduler>,
    control: Arc<dyn ChatControl>,
    read_message: bool,
}

impl EventPipeline {
    pub fn new(
        filter: FilterConfig,
        registry: Arc<SessionTokenRegistry>,
        dispatcher: NotificationDispatcher,
        archive: Arc<ArchivePolicyScheduler>,
        control: Arc<dyn ChatControl>,
    ) -> Self {
        Self {
            filter,
            registry,
            dispatcher,
            archive,
            control,
            read_message: false,
        }
    }

    /// Ask the chat-control collaborator to mark chats read after an
    /// accepted message.
    pub fn with_read_message(mut self, read_message: bool) -> Self {
        self.read_message = read_message;
        self
    }

    pub fn registry(&self) -> &Arc<SessionTokenRegistry> {
        &self.registry
    }

    /// Runs one event through filtering and dispatch.
    pub async fn submit(&self, mut event: RuntimeEvent) -> Decision {
        if event.id.is_empty() {
            event.id = uuid::Uuid::new_v4().to_string();
        }

        // Archive timing follows ingestion time, not the sender's clock.
        self.archive
            .record_activity(event.conversation_key(), Utc::now());

        let self_identity = self.registry.self_identity(&event.session).await;
        let decision = decide(&event, &self.filter, self_identity.as_deref());

        if let Some(reason) = decision.suppressed {
            debug!(event_id = %event.id, kind = %event.kind, %reason, "event suppressed");
            metrics::counter!("zapkeep_events_suppressed_total", "reason" => reason.to_string())
                .increment(1);
            return decision;
        }

        metrics::counter!("zapkeep_events_total", "kind" => event.kind.to_string()).increment(1);
        self.dispatcher.dispatch(&event, &decision);

        match event.kind {
            EventKind::Message if self.read_message => {
                if let Err(e) = self
                    .control
                    .mark_read(&event.session, event.conversation())
                    .await
                {
                    warn!(event_id = %event.id, error = %e, "failed to mark chat as read");
                }
            }
            EventKind::StatusChange => self.record_status(&event).await,
            _ => {}
        }

        decision
    }

    /// Status changes keep the session fresh. Once connected, the automation
    /// layer reports the session's own JID as `payload.self_jid`.
    async fn record_status(&self, event: &RuntimeEvent) {
        let result = match event.payload.get("self_jid").and_then(|v| v.as_str()) {
            Some(jid) => self.registry.bind_identity(&event.session, jid).await,
            None => self.registry.touch(&event.session).await,
        };
        match result {
            Ok(_) | Err(ZapkeepError::NotFound { .. }) => {}
            Err(e) => warn!(session = %event.session, error = %e, "failed to update session"),
        }
    }

    /// Pulls the unread messages of `session` and feeds them through
    /// [`submit`](Self::submit), oldest first. Returns how many were replayed.
    pub async fn replay_unread(&self, session: &str) -> Result<usize, ZapkeepError> {
        let events = self.control.unread_events(session).await?;
        let count = events.len();
        for event in events {
            self.submit(event).await;
        }
        info!(session, count, "unread messages replayed");
        Ok(count)
    }
}

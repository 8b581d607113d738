// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routes filtered events to the channel workers.
//!
//! The dispatcher trusts the [`Decision`] it is given and never filters
//! again. Each eligible channel gets its own queued delivery, so a slow
//! webhook never holds up websocket subscribers.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use zapkeep_config::ZapkeepConfig;
use zapkeep_core::{MediaFetcher, ObjectStorage, RuntimeEvent, ZapkeepError};

use crate::failure::FailureLog;
use crate::filter::Decision;
use crate::hub::{WebsocketChannel, WebsocketHub};
use crate::labels::LabelMapper;
use crate::media::{MediaResolver, upload_target};
use crate::webhook::WebhookChannel;
use crate::worker::{ChannelHandle, ChannelWorker, Delivery};

/// External media collaborators handed to the dispatcher.
#[derive(Clone, Default)]
pub struct MediaCollaborators {
    pub fetcher: Option<Arc<dyn MediaFetcher>>,
    pub storage: Option<Arc<dyn ObjectStorage>>,
}

pub struct NotificationDispatcher {
    webhook: Option<ChannelHandle>,
    websocket: Option<ChannelHandle>,
    labels: LabelMapper,
}

impl NotificationDispatcher {
    /// A dispatcher over already-running workers.
    pub fn new(
        webhook: Option<ChannelHandle>,
        websocket: Option<ChannelHandle>,
        labels: LabelMapper,
    ) -> Self {
        Self {
            webhook,
            websocket,
            labels,
        }
    }

    /// Spawns the webhook and websocket workers described by `config`.
    ///
    /// The returned join handles finish once `cancel` fires and in-flight
    /// deliveries settle.
    pub fn start(
        config: &ZapkeepConfig,
        hub: WebsocketHub,
        collaborators: MediaCollaborators,
        failures: Arc<FailureLog>,
        cancel: CancellationToken,
    ) -> Result<(Self, Vec<JoinHandle<()>>), ZapkeepError> {
        let media = MediaResolver::new(
            collaborators.fetcher,
            collaborators.storage,
            upload_target(&config.aws_s3),
        );
        let mut tasks = Vec::new();

        let webhook = match WebhookChannel::from_config(&config.webhook, cancel.clone())? {
            Some(channel) => {
                let (handle, task) = ChannelWorker {
                    channel: Arc::new(channel),
                    media: media.clone(),
                    concurrency: config.webhook.concurrency,
                    failures: failures.clone(),
                }
                .spawn(cancel.clone());
                tasks.push(task);
                Some(handle)
            }
            None => None,
        };

        let websocket = if config.websocket.enabled {
            let (handle, task) = ChannelWorker {
                channel: Arc::new(WebsocketChannel::new(hub)),
                media,
                concurrency: config.websocket.concurrency,
                failures,
            }
            .spawn(cancel);
            tasks.push(task);
            Some(handle)
        } else {
            None
        };

        let dispatcher = Self::new(webhook, websocket, LabelMapper::from_config(&config.mapper));
        Ok((dispatcher, tasks))
    }

    /// Queues `event` on every channel `decision` marks eligible.
    /// Returns the number of channels it was queued on. Never blocks.
    pub fn dispatch(&self, event: &RuntimeEvent, decision: &Decision) -> usize {
        if !decision.any_channel() {
            return 0;
        }

        let mut mapped = event.clone();
        mapped.labels = self.labels.apply(std::mem::take(&mut mapped.labels));
        let event = Arc::new(mapped);

        let targets = [
            (
                decision.webhook_eligible,
                self.webhook.as_ref(),
                decision.webhook_media,
            ),
            (
                decision.websocket_eligible,
                self.websocket.as_ref(),
                decision.websocket_media,
            ),
        ];

        let mut queued = 0;
        for (eligible, handle, media) in targets {
            let Some(handle) = handle.filter(|_| eligible) else {
                continue;
            };
            let delivery = Delivery {
                event: event.clone(),
                media,
            };
            match handle.submit(delivery) {
                Ok(()) => queued += 1,
                Err(e) => warn!(
                    channel = handle.name(),
                    event_id = %event.id,
                    error = %e,
                    "could not queue delivery"
                ),
            }
        }

        debug!(event_id = %event.id, kind = %event.kind, queued, "event dispatched");
        queued
    }
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-channel delivery worker.
//!
//! Submissions go into an unbounded FIFO queue, so submitting never blocks
//! and never drops. One worker task pulls jobs in order, waits for a
//! concurrency permit, and starts each delivery on its own task. Deliveries
//! therefore start in submission order while at most `concurrency` run at
//! once.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use zapkeep_core::{RuntimeEvent, ZapkeepError};

use crate::envelope::Envelope;
use crate::failure::{FailureLog, FailureRecord};
use crate::filter::MediaPlan;
use crate::media::MediaResolver;

/// Transport for one delivery channel.
#[async_trait]
pub trait DeliveryChannel: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Delivers one envelope, retrying internally if the channel retries.
    async fn send(&self, envelope: &Envelope) -> Result<(), ZapkeepError>;
}

/// One queued delivery.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Event with labels already mapped.
    pub event: Arc<RuntimeEvent>,
    pub media: MediaPlan,
}

/// Submission side of a channel worker.
#[derive(Clone)]
pub struct ChannelHandle {
    name: &'static str,
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Queues a delivery. Fails only once the worker has shut down.
    pub fn submit(&self, delivery: Delivery) -> Result<(), ZapkeepError> {
        self.tx.send(delivery).map_err(|_| {
            ZapkeepError::Internal(format!("{} worker has stopped", self.name))
        })
    }
}

/// Everything a worker needs besides its queue.
pub struct ChannelWorker {
    pub channel: Arc<dyn DeliveryChannel>,
    pub media: MediaResolver,
    pub concurrency: usize,
    pub failures: Arc<FailureLog>,
}

impl ChannelWorker {
    /// Spawns the worker task. It stops when `cancel` fires or every handle
    /// is dropped, then waits for in-flight deliveries.
    pub fn spawn(self, cancel: CancellationToken) -> (ChannelHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ChannelHandle {
            name: self.channel.name(),
            tx,
        };
        let task = tokio::spawn(self.run(rx, cancel));
        (handle, task)
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<Delivery>, cancel: CancellationToken) {
        let name = self.channel.name();
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));
        let media = Arc::new(self.media);
        let mut in_flight = JoinSet::new();

        info!(channel = name, concurrency = self.concurrency, "delivery worker started");

        let mut taken = None;
        loop {
            let delivery = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = rx.recv() => match next {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    taken = Some(delivery);
                    break;
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        taken = Some(delivery);
                        break;
                    }
                },
            };

            let channel = self.channel.clone();
            let media = media.clone();
            let failures = self.failures.clone();
            in_flight.spawn(async move {
                let _permit = permit;
                deliver_one(channel.as_ref(), &media, &failures, delivery).await;
            });

            while in_flight.try_join_next().is_some() {}
        }

        let abandoned = abandon_queued(&mut rx, taken);
        if abandoned > 0 {
            info!(channel = name, abandoned, "queued deliveries dropped at shutdown");
        }
        while in_flight.join_next().await.is_some() {}
        info!(channel = name, "delivery worker stopped");
    }
}

/// Closes the queue and counts deliveries that will never start, including
/// one already taken off the queue while waiting for a permit.
fn abandon_queued(rx: &mut mpsc::UnboundedReceiver<Delivery>, taken: Option<Delivery>) -> usize {
    rx.close();
    usize::from(taken.is_some()) + std::iter::from_fn(|| rx.try_recv().ok()).count()
}

async fn deliver_one(
    channel: &dyn DeliveryChannel,
    media: &MediaResolver,
    failures: &FailureLog,
    delivery: Delivery,
) {
    let name = channel.name();
    let outcome = media.resolve(&delivery.event, delivery.media).await;
    let envelope = Envelope::new(&delivery.event, outcome);

    match channel.send(&envelope).await {
        Ok(()) => {
            metrics::counter!("zapkeep_deliveries_total", "channel" => name).increment(1);
        }
        Err(ZapkeepError::Cancelled) => {
            debug!(channel = name, event_id = %envelope.id, "delivery cancelled by shutdown");
        }
        Err(e) => failures.record(FailureRecord::new(&delivery.event, name, &e)),
    }
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Websocket fan-out hub.
//!
//! Each subscriber owns a bounded queue. Broadcasting never waits on a
//! subscriber: when a queue is full its oldest message is dropped. The
//! number of live subscriptions is capped; excess subscriptions are refused.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use zapkeep_core::ZapkeepError;

use crate::envelope::Envelope;
use crate::worker::DeliveryChannel;

struct SubscriberQueue {
    /// `None` receives every session.
    session: Option<String>,
    messages: Mutex<VecDeque<Arc<str>>>,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl SubscriberQueue {
    fn push(&self, message: Arc<str>, capacity: usize) {
        let mut queue = self
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if queue.len() >= capacity {
            queue.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        queue.push_back(message);
        drop(queue);
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Arc<str>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }

    fn wants(&self, session: &str) -> bool {
        self.session.as_deref().is_none_or(|s| s == session)
    }
}

struct HubInner {
    subscribers: DashMap<u64, Arc<SubscriberQueue>>,
    next_id: AtomicU64,
    active: AtomicUsize,
    max_subscribers: usize,
    queue_capacity: usize,
}

/// Shared handle to the hub. Cheap to clone.
#[derive(Clone)]
pub struct WebsocketHub {
    inner: Arc<HubInner>,
}

impl WebsocketHub {
    pub fn new(max_subscribers: usize, queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                active: AtomicUsize::new(0),
                max_subscribers,
                queue_capacity: queue_capacity.max(1),
            }),
        }
    }

    /// Registers a subscriber for one session, or for all sessions with `None`.
    ///
    /// Fails with `SubscriberLimit` once `max_subscribers` are connected.
    pub fn subscribe(&self, session: Option<String>) -> Result<Subscription, ZapkeepError> {
        let limit = self.inner.max_subscribers;
        self.inner
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < limit).then_some(n + 1)
            })
            .map_err(|_| {
                warn!(limit, "websocket subscriber limit reached");
                ZapkeepError::SubscriberLimit { limit }
            })?;

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let queue = Arc::new(SubscriberQueue {
            session,
            messages: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        });
        self.inner.subscribers.insert(id, queue.clone());
        debug!(subscriber = id, session = ?queue.session, "websocket subscriber added");

        Ok(Subscription {
            id,
            queue,
            hub: self.inner.clone(),
        })
    }

    /// Queues `message` for every subscriber interested in `session`.
    /// Returns how many subscribers it was queued for.
    pub fn broadcast(&self, session: &str, message: Arc<str>) -> usize {
        let mut delivered = 0;
        for entry in self.inner.subscribers.iter() {
            let queue = entry.value();
            if queue.wants(session) {
                queue.push(message.clone(), self.inner.queue_capacity);
                delivered += 1;
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Wakes every subscriber with end-of-stream. Used on shutdown.
    pub fn close_all(&self) {
        for entry in self.inner.subscribers.iter() {
            entry.value().closed.store(true, Ordering::SeqCst);
            entry.value().notify.notify_one();
        }
        info!(count = self.inner.subscribers.len(), "websocket subscribers closed");
    }
}

/// One live subscription. Dropping it frees its slot.
pub struct Subscription {
    id: u64,
    queue: Arc<SubscriberQueue>,
    hub: Arc<HubInner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next queued message; `None` once the hub is closed and the queue drained.
    pub async fn recv(&self) -> Option<Arc<str>> {
        loop {
            if let Some(message) = self.queue.pop() {
                return Some(message);
            }
            if self.queue.closed.load(Ordering::SeqCst) {
                return None;
            }
            self.queue.notify.notified().await;
        }
    }

    /// Messages discarded because this subscriber fell behind.
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.hub.subscribers.remove(&self.id).is_some() {
            self.hub.active.fetch_sub(1, Ordering::SeqCst);
        }
        debug!(subscriber = self.id, "websocket subscriber removed");
    }
}

/// Delivery channel that serializes the envelope once and fans it out.
pub struct WebsocketChannel {
    hub: WebsocketHub,
}

impl WebsocketChannel {
    pub fn new(hub: WebsocketHub) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl DeliveryChannel for WebsocketChannel {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn send(&self, envelope: &Envelope) -> Result<(), ZapkeepError> {
        let json = serde_json::to_string(envelope).map_err(|e| {
            ZapkeepError::Internal(format!("failed to serialize envelope: {e}"))
        })?;
        let receivers = self.hub.broadcast(&envelope.session, Arc::from(json));
        debug!(event_id = %envelope.id, receivers, "websocket broadcast");
        Ok(())
    }
}

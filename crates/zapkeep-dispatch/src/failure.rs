// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record of deliveries that were given up on.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::error;

use zapkeep_core::{EventKind, RuntimeEvent, ZapkeepError};

/// Default number of failures kept in memory.
pub const DEFAULT_FAILURE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub event_id: String,
    pub event: EventKind,
    pub session: String,
    pub channel: String,
    pub attempts: u32,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(event: &RuntimeEvent, channel: &str, err: &ZapkeepError) -> Self {
        let attempts = match err {
            ZapkeepError::DeliveryFailed { attempts, .. } => *attempts,
            _ => 1,
        };
        Self {
            event_id: event.id.clone(),
            event: event.kind,
            session: event.session.clone(),
            channel: channel.to_string(),
            attempts,
            error: err.to_string(),
            failed_at: Utc::now(),
        }
    }
}

/// Bounded, newest-last log of delivery failures.
pub struct FailureLog {
    records: Mutex<VecDeque<FailureRecord>>,
    capacity: usize,
}

impl FailureLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, record: FailureRecord) {
        error!(
            event_id = %record.event_id,
            event = %record.event,
            session = %record.session,
            channel = %record.channel,
            attempts = record.attempts,
            error = %record.error,
            "delivery failed permanently"
        );
        metrics::counter!("zapkeep_delivery_failures_total", "channel" => record.channel.clone())
            .increment(1);

        let mut records = self.lock();
        if records.len() >= self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Snapshot of the retained failures, oldest first.
    pub fn recent(&self) -> Vec<FailureRecord> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<FailureRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for FailureLog {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_CAPACITY)
    }
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inactivity-driven archiving of conversations.
//!
//! Per conversation: `active -> pending` after `wait_time` seconds without
//! activity, `pending -> archived` once `days_to_archive` days have passed
//! since the last activity. Any activity resets the conversation to active.
//! Archived conversations are handed off and forgotten; new activity tracks
//! them again from scratch. A disabled policy tracks nothing.
//! [`ArchivePolicyScheduler::tick`] takes the clock as an argument so the
//! state machine can be walked deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zapkeep_config::model::ArchiveConfig;
use zapkeep_core::{ChatControl, ConversationKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchivePhase {
    Active,
    Pending,
    Archived,
}

#[derive(Debug, Clone, Copy)]
struct ArchiveEntry {
    last_activity: DateTime<Utc>,
    phase: ArchivePhase,
}

/// Global archive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchivePolicy {
    pub enabled: bool,
    pub wait_time: TimeDelta,
    pub archive_after: TimeDelta,
}

impl ArchivePolicy {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        let wait_secs = i64::try_from(config.wait_time).unwrap_or(i64::MAX);
        Self {
            enabled: config.enable,
            wait_time: TimeDelta::try_seconds(wait_secs).unwrap_or(TimeDelta::MAX),
            archive_after: TimeDelta::try_days(i64::from(config.days_to_archive))
                .unwrap_or(TimeDelta::MAX),
        }
    }
}

pub struct ArchivePolicyScheduler {
    policy: ArchivePolicy,
    entries: Mutex<HashMap<ConversationKey, ArchiveEntry>>,
}

impl ArchivePolicyScheduler {
    pub fn new(policy: ArchivePolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> ArchivePolicy {
        self.policy
    }

    /// Marks the conversation active as of `at`. No-op when the policy is
    /// disabled.
    pub fn record_activity(&self, key: ConversationKey, at: DateTime<Utc>) {
        if !self.policy.enabled {
            return;
        }
        let mut entries = self.lock();
        let entry = entries.entry(key).or_insert(ArchiveEntry {
            last_activity: at,
            phase: ArchivePhase::Active,
        });
        entry.last_activity = entry.last_activity.max(at);
        entry.phase = ArchivePhase::Active;
    }

    /// Current phase, or `None` when the conversation is not tracked
    /// (never seen, already archived, or policy disabled).
    pub fn phase(&self, key: &ConversationKey) -> Option<ArchivePhase> {
        self.lock().get(key).map(|e| e.phase)
    }

    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    /// Advances every conversation as of `now` and returns the ones that
    /// became archived during this tick; those are dropped from tracking.
    /// Both transitions may happen in one tick. A disabled policy
    /// transitions nothing.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<ConversationKey> {
        if !self.policy.enabled {
            return Vec::new();
        }

        let mut archived = Vec::new();
        let mut entries = self.lock();
        for (key, entry) in entries.iter_mut() {
            let idle = now - entry.last_activity;
            if entry.phase == ArchivePhase::Active && idle >= self.policy.wait_time {
                entry.phase = ArchivePhase::Pending;
                debug!(conversation = %key, "conversation pending archive");
            }
            if entry.phase == ArchivePhase::Pending && idle >= self.policy.archive_after {
                entry.phase = ArchivePhase::Archived;
                archived.push(key.clone());
            }
        }
        entries.retain(|_, entry| entry.phase != ArchivePhase::Archived);
        drop(entries);
        archived.sort();
        archived
    }

    /// Ticks every `interval` until `cancel` fires, handing newly archived
    /// conversations to `control`.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        control: Arc<dyn ChatControl>,
        cancel: CancellationToken,
    ) {
        if !self.policy.enabled {
            debug!("archive policy disabled, scheduler idle");
            return;
        }

        info!(interval_secs = interval.as_secs(), "archive scheduler started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for key in self.tick(Utc::now()) {
                match control.archive_chat(&key.session, &key.chat).await {
                    Ok(()) => {
                        info!(conversation = %key, "conversation archived");
                        metrics::counter!("zapkeep_archived_total").increment(1);
                    }
                    Err(e) => warn!(conversation = %key, error = %e, "archive request failed"),
                }
            }
        }
        info!("archive scheduler stopped");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationKey, ArchiveEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

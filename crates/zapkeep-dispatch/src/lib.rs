// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification pipeline for the zapkeep session server.
//!
//! Runtime events enter through [`EventPipeline::submit`], are judged by
//! the pure [`filter::decide`], and are queued on per-channel workers by
//! the [`NotificationDispatcher`]:
//! - the webhook channel POSTs JSON envelopes with bounded retries
//! - the websocket channel fans envelopes out through the [`WebsocketHub`]
//!
//! The [`ArchivePolicyScheduler`] runs alongside, archiving conversations
//! that have gone quiet.

pub mod archive;
pub mod control;
pub mod dispatcher;
pub mod envelope;
pub mod failure;
pub mod filter;
pub mod hub;
pub mod labels;
pub mod media;
pub mod pipeline;
pub mod shutdown;
pub mod webhook;
pub mod worker;

pub use archive::{ArchivePhase, ArchivePolicy, ArchivePolicyScheduler};
pub use control::LoggingChatControl;
pub use dispatcher::{MediaCollaborators, NotificationDispatcher};
pub use envelope::{Envelope, MediaOutcome, MediaPayload};
pub use failure::{FailureLog, FailureRecord};
pub use filter::{Decision, FilterConfig, MediaPlan, Suppression, decide};
pub use hub::{Subscription, WebsocketChannel, WebsocketHub};
pub use labels::LabelMapper;
pub use media::{HttpMediaFetcher, MediaResolver};
pub use pipeline::EventPipeline;
pub use webhook::{RetryPolicy, WebhookChannel};
pub use worker::{ChannelHandle, ChannelWorker, DeliveryChannel};

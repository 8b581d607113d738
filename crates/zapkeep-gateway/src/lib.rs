// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the zapkeep session server.
//!
//! The automation layer posts runtime events to `POST /v1/events`; they
//! go through the [`EventPipeline`](zapkeep_dispatch::EventPipeline) and
//! come back out as webhook calls and as frames on `GET /ws`.

pub mod auth;
pub mod handlers;
pub mod server;
pub mod ws;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, ServerConfig, router, start_server};

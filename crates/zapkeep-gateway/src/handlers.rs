// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /health, POST /v1/events, GET /v1/failures.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use zapkeep_core::{HealthStatus, RuntimeEvent};
use zapkeep_dispatch::FailureRecord;

use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    /// Store backend name and probe result.
    pub store: String,
    pub store_status: String,
    pub sessions: usize,
    pub subscribers: usize,
}

/// Response body for POST /v1/events.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventAccepted {
    pub id: String,
    pub webhook: bool,
    pub websocket: bool,
    /// Why the event was dropped, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppressed: Option<String>,
}

/// Response body for GET /v1/failures.
#[derive(Debug, Serialize)]
pub struct FailureListResponse {
    pub failures: Vec<FailureRecord>,
}

/// GET /health
///
/// Unauthenticated. Reports `degraded` (still 200) when the store probe fails.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let registry = state.pipeline.registry();
    let backend = registry.backend();
    let store_status = match backend.health_check().await {
        Ok(HealthStatus::Healthy) => "healthy".to_string(),
        Ok(HealthStatus::Degraded(reason)) => format!("degraded: {reason}"),
        Ok(HealthStatus::Unhealthy(reason)) => format!("unhealthy: {reason}"),
        Err(e) => format!("unhealthy: {e}"),
    };
    let status = if store_status == "healthy" {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        store: backend.name().to_string(),
        store_status,
        sessions: registry.list().len(),
        subscribers: state.hub.subscriber_count(),
    })
}

/// POST /v1/events
///
/// Ingests one runtime event from the automation layer. Returns once the
/// event has been filtered and queued, not once it has been delivered.
pub async fn post_event(
    State(state): State<GatewayState>,
    Json(mut event): Json<RuntimeEvent>,
) -> (StatusCode, Json<EventAccepted>) {
    if event.id.is_empty() {
        event.id = uuid::Uuid::new_v4().to_string();
    }
    let id = event.id.clone();

    let decision = state.pipeline.submit(event).await;
    tracing::debug!(event_id = %id, suppressed = ?decision.suppressed, "event ingested");

    (
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            id,
            webhook: decision.webhook_eligible,
            websocket: decision.websocket_eligible,
            suppressed: decision.suppressed.map(|s| s.to_string()),
        }),
    )
}

/// GET /v1/failures
///
/// Recent permanent delivery failures, oldest first.
pub async fn get_failures(State(state): State<GatewayState>) -> Json<FailureListResponse> {
    Json(FailureListResponse {
        failures: state.failures.recent(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_omits_missing_suppression() {
        let body = EventAccepted {
            id: "e1".into(),
            webhook: true,
            websocket: false,
            suppressed: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"id\":\"e1\""));
        assert!(!json.contains("suppressed"));
    }

    #[test]
    fn event_body_needs_only_kind_session_sender() {
        let event: RuntimeEvent = serde_json::from_str(
            r#"{"kind":"poll-response","session":"A","sender":"1@c.us"}"#,
        )
        .unwrap();
        assert!(event.id.is_empty());
        assert_eq!(event.conversation(), "1@c.us");
    }
}

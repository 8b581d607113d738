// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use zapkeep_config::ZapkeepConfig;
use zapkeep_core::ZapkeepError;
use zapkeep_dispatch::{EventPipeline, FailureLog, WebsocketHub};

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::ws;

/// State for the unauthenticated health endpoint.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<EventPipeline>,
    pub hub: WebsocketHub,
    pub failures: Arc<FailureLog>,
    pub auth: AuthConfig,
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(
        pipeline: Arc<EventPipeline>,
        hub: WebsocketHub,
        failures: Arc<FailureLog>,
        bearer_token: Option<String>,
    ) -> Self {
        Self {
            pipeline,
            hub,
            failures,
            auth: AuthConfig { bearer_token },
            health: HealthState {
                start_time: std::time::Instant::now(),
            },
        }
    }
}

/// Listener settings taken from the `server` section.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Value of the `X-Powered-By` response header; empty disables it.
    pub powered_by: String,
}

impl ServerConfig {
    pub fn from_config(config: &ZapkeepConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            powered_by: config.server.powered_by.clone(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr())
            .field("powered_by", &self.powered_by)
            .finish()
    }
}

const X_POWERED_BY: HeaderName = HeaderName::from_static("x-powered-by");

async fn powered_by_header(
    State(value): State<Option<HeaderValue>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    if let Some(value) = value {
        response.headers_mut().insert(X_POWERED_BY, value);
    }
    response
}

/// Builds the router:
/// - GET /health (public)
/// - GET /ws (public, subscription capped by the hub)
/// - POST /v1/events, GET /v1/failures (bearer auth)
pub fn router(state: GatewayState, powered_by: &str) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ws", get(ws::ws_handler))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/events", post(handlers::post_event))
        .route("/v1/failures", get(handlers::get_failures))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    let header = Some(powered_by)
        .filter(|v| !v.is_empty())
        .and_then(|v| match HeaderValue::from_str(v) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(powered_by = v, "powered_by is not a valid header value, omitting");
                None
            }
        });

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(axum_middleware::from_fn_with_state(header, powered_by_header))
        .layer(TraceLayer::new_for_http())
}

/// Serves the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), ZapkeepError> {
    let app = router(state, &config.powered_by);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ZapkeepError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ZapkeepError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

// SPDX-FileCopyrightText: 2026 Zapkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket subscription endpoint.
//!
//! `GET /ws?session=<name>` streams the JSON envelopes of one session;
//! without `session` every session is streamed. The stream is one-way:
//! client frames other than close are ignored.

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use zapkeep_core::ZapkeepError;
use zapkeep_dispatch::Subscription;

use crate::server::GatewayState;

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub session: Option<String>,
}

/// WebSocket upgrade handler.
///
/// The subscription is taken before upgrading so a full hub answers
/// 503 instead of accepting and immediately closing.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<GatewayState>,
) -> Response {
    let session = query.session.filter(|s| !s.is_empty());
    match state.hub.subscribe(session) {
        Ok(subscription) => ws.on_upgrade(move |socket| handle_socket(socket, subscription)),
        Err(ZapkeepError::SubscriberLimit { limit }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("websocket listener limit of {limit} reached"),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "websocket subscribe failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_socket(socket: WebSocket, subscription: Subscription) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let id = subscription.id();
    tracing::debug!(subscriber = id, "websocket connected");

    loop {
        tokio::select! {
            outgoing = subscription.recv() => match outgoing {
                Some(frame) => {
                    if ws_sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = ws_receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let dropped = subscription.dropped();
    if dropped > 0 {
        tracing::info!(subscriber = id, dropped, "slow websocket subscriber lost messages");
    }
    tracing::debug!(subscriber = id, "websocket disconnected");
}

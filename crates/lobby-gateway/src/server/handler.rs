//! WebSocket handler
//!
//! One session per connection: created on upgrade, closed when the socket ends.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        ConnectInfo, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use lobby_core::SessionId;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::connection::WsTransport;
use crate::handlers::{HandlerError, MessageDispatcher};
use crate::protocol::{ClientMessage, ServerReply};
use crate::server::GatewayState;

/// Reason recorded when the client side goes away
pub const DISCONNECT_REASON: &str = "disconnect";

/// WebSocket upgrade handler
pub async fn ws_handler(
    State(state): State<GatewayState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let remote_addr = connect_info.map(|ConnectInfo(addr)| addr);
    ws.on_upgrade(move |socket| handle_socket(state, socket, remote_addr))
}

fn to_frame(message: Bytes) -> Message {
    match std::str::from_utf8(&message) {
        Ok(text) => Message::Text(text.to_owned().into()),
        Err(_) => Message::Binary(message.to_vec().into()),
    }
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, remote_addr: Option<SocketAddr>) {
    let sid = state.next_session_id();
    let (transport, mut rx, close) = WsTransport::channel(remote_addr);
    state
        .sessions()
        .create(sid, state.config().server.id.clone(), Arc::new(transport));

    tracing::info!(session_id = sid, remote_addr = ?remote_addr, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let state_recv = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(e) = handle_text_message(&state_recv, sid, &text).await {
                        tracing::debug!(session_id = sid, error = %e, "Closing connection after handler error");
                        return;
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = sid, "Binary messages not supported");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong is handled automatically by axum
                    tracing::trace!(session_id = sid, "Ping/Pong received");
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = sid, "Client closed connection");
                    return;
                }
                Err(e) => {
                    tracing::warn!(session_id = sid, error = %e, "WebSocket error");
                    return;
                }
            }
        }
    });

    let send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                batch = rx.recv() => {
                    let Some(batch) = batch else { break };
                    let mut failed = false;
                    for message in batch {
                        if ws_sink.feed(to_frame(message)).await.is_err() {
                            failed = true;
                            break;
                        }
                    }
                    if failed || ws_sink.flush().await.is_err() {
                        tracing::warn!(session_id = sid, "Failed to send message to WebSocket");
                        break;
                    }
                }
                () = close.notified() => {
                    tracing::debug!(session_id = sid, "Server closed connection");
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    tokio::select! {
        _ = recv_task => {
            tracing::debug!(session_id = sid, "Receive task ended");
        }
        _ = send_task => {
            tracing::debug!(session_id = sid, "Send task ended");
        }
    }

    // No-op when the session was already kicked
    state.sessions().close(sid, DISCONNECT_REASON);
    tracing::info!(session_id = sid, "WebSocket connection cleaned up");
}

/// Handle a text frame. An error ends the connection.
async fn handle_text_message(
    state: &GatewayState,
    sid: SessionId,
    text: &str,
) -> Result<(), HandlerError> {
    let message = match ClientMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(session_id = sid, error = %e, "Failed to parse message");
            reply_error(state, sid, "unknown", &HandlerError::InvalidPayload(e.to_string()));
            return Ok(());
        }
    };

    let op = message.op();
    tracing::trace!(session_id = sid, op = %op, "Received message");

    match MessageDispatcher::dispatch(state, sid, message).await {
        Ok(true) => {
            if let Ok(ack) = ServerReply::ack(op) {
                state.sessions().send_message(sid, ack);
            }
            Ok(())
        }
        Ok(false) => Ok(()),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::debug!(session_id = sid, op = %op, error = %e, "Client op rejected");
            reply_error(state, sid, op, &e);
            Ok(())
        }
    }
}

fn reply_error(state: &GatewayState, sid: SessionId, op: &str, err: &HandlerError) {
    if let Ok(reply) = ServerReply::error(op, err.code(), &err.to_string()) {
        state.sessions().send_message(sid, reply);
    }
}

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use hyperspace_core::events::{EVENT_ASSOCIATED, EVENT_CONNECTED, EVENT_ERROR};
use serde::Serialize;

use crate::correlation::CorrelationRouter;
use crate::error::AppError;
use crate::state::AppState;
use crate::ws::protocol::{
    AssociatedPayload, ClientMessage, ConnectedPayload, ErrorPayload, ServerEvent,
};
use crate::ws::registry::ConnectionRegistry;

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with the
/// [`ConnectionRegistry`] and managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.connections, state.correlation))
}

/// Manage a single hub connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection and tells the client its id.
///   2. Spawns a sender task that forwards messages from the registry channel.
///   3. Processes inbound hub method calls on the current task.
///   4. Unregisters on disconnect, which drops all its token bindings.
async fn handle_socket(
    socket: WebSocket,
    connections: Arc<ConnectionRegistry>,
    correlation: Arc<CorrelationRouter>,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "Client connected");

    let mut rx = connections.register(conn_id.clone()).await;
    send_event(
        &connections,
        &conn_id,
        EVENT_CONNECTED,
        ConnectedPayload {
            connection_id: &conn_id,
        },
    )
    .await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    let mut close_reason: Option<String> = None;
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                handle_client_frame(&connections, &correlation, &conn_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Binary(_)) => {
                send_error(
                    &connections,
                    &conn_id,
                    "UNSUPPORTED_FRAME",
                    "Binary frames are not supported",
                )
                .await;
            }
            Ok(Message::Ping(_)) => {}
            Err(e) => {
                close_reason = Some(e.to_string());
                break;
            }
        }
    }

    connections.unregister(&conn_id).await;
    send_task.abort();
    match close_reason {
        Some(reason) => {
            tracing::warn!(conn_id = %conn_id, reason = %reason, "Client disconnected with error");
        }
        None => tracing::info!(conn_id = %conn_id, "Client disconnected"),
    }
}

/// Dispatch one inbound text frame.
async fn handle_client_frame(
    connections: &ConnectionRegistry,
    correlation: &CorrelationRouter,
    conn_id: &str,
    text: &str,
) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(conn_id, error = %e, "Malformed hub frame");
            send_error(connections, conn_id, "MALFORMED_FRAME", &e.to_string()).await;
            return;
        }
    };

    match message {
        ClientMessage::AssociateWithTrackingId { tracking_id } => {
            match correlation.bind_request(conn_id, &tracking_id).await {
                Ok(()) => {
                    send_event(
                        connections,
                        conn_id,
                        EVENT_ASSOCIATED,
                        AssociatedPayload {
                            tracking_id: &tracking_id,
                        },
                    )
                    .await;
                }
                Err(e) => {
                    let (_, code, message) = AppError::from(e).classify();
                    send_error(connections, conn_id, code, &message).await;
                }
            }
        }
    }
}

async fn send_event<T: Serialize>(
    connections: &ConnectionRegistry,
    conn_id: &str,
    event: &str,
    payload: T,
) {
    match ServerEvent::new(event, payload).to_message() {
        Ok(msg) => {
            if let Err(e) = connections.send(conn_id, msg).await {
                tracing::debug!(conn_id, event, error = %e, "Hub reply not sent");
            }
        }
        Err(e) => tracing::error!(conn_id, event, error = %e, "Failed to encode hub event"),
    }
}

async fn send_error(connections: &ConnectionRegistry, conn_id: &str, code: &str, message: &str) {
    send_event(connections, conn_id, EVENT_ERROR, ErrorPayload { code, message }).await;
}

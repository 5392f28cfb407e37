use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use hyperspace_core::error::CoreError;
use hyperspace_core::types::{ConnectionId, Timestamp, TrackingToken};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

/// Frames a connection may have queued before sends to it start failing.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Queue slots that [`ConnectionRegistry::broadcast`] leaves free, so a
/// connection backed up with scene updates can still take direct sends.
pub const DIRECT_SEND_RESERVE: usize = 16;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::Sender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    /// Tokens this connection is bound to. Mirrors `groups` so that
    /// unregistering does not have to scan every group.
    tokens: HashSet<TrackingToken>,
}

/// Failure to hand a message to a single connection.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    #[error("connection {0} has a full outbound queue")]
    Backlogged(ConnectionId),
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, WsConnection>,
    /// Token -> bound connection ids. Never holds an empty set.
    groups: HashMap<TrackingToken, HashSet<ConnectionId>>,
}

/// Tracks live WebSocket connections and their tracking-token groups.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. The lock is only held for map operations:
/// every read used for delivery copies what it needs and releases the lock
/// before any message is sent.
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Register a connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink. Registering an id that is
    /// already known replaces its channel and keeps its bindings.
    pub async fn register(&self, conn_id: ConnectionId) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let mut inner = self.inner.write().await;

        match inner.connections.get_mut(&conn_id) {
            Some(existing) => {
                tracing::debug!(conn_id = %conn_id, "Connection re-registered");
                existing.sender = tx;
            }
            None => {
                inner.connections.insert(
                    conn_id,
                    WsConnection {
                        sender: tx,
                        connected_at: chrono::Utc::now(),
                        tokens: HashSet::new(),
                    },
                );
            }
        }
        rx
    }

    /// Remove a connection and every binding it holds.
    ///
    /// Groups left empty are pruned. Unknown ids are a no-op. Returns `true`
    /// if the connection was registered.
    pub async fn unregister(&self, conn_id: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(conn) = inner.connections.remove(conn_id) else {
            return false;
        };

        for token in &conn.tokens {
            remove_member(&mut inner.groups, token, conn_id);
        }

        let connected_secs = (chrono::Utc::now() - conn.connected_at).num_seconds();
        tracing::debug!(
            conn_id,
            connected_secs,
            released_bindings = conn.tokens.len(),
            "Connection unregistered",
        );
        true
    }

    /// Bind a registered connection to `token`, creating the group if needed.
    ///
    /// Idempotent. Returns `true` if the binding is new.
    pub async fn bind(&self, conn_id: &str, token: &TrackingToken) -> Result<bool, CoreError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let conn = inner
            .connections
            .get_mut(conn_id)
            .ok_or_else(|| CoreError::UnknownConnection(conn_id.to_string()))?;

        if !conn.tokens.insert(token.clone()) {
            return Ok(false);
        }
        inner
            .groups
            .entry(token.clone())
            .or_default()
            .insert(conn_id.to_string());
        Ok(true)
    }

    /// Remove a single binding. Returns `true` if it existed.
    pub async fn unbind(&self, conn_id: &str, token: &TrackingToken) -> bool {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let removed = inner
            .connections
            .get_mut(conn_id)
            .is_some_and(|conn| conn.tokens.remove(token));
        if removed {
            remove_member(&mut inner.groups, token, conn_id);
        }
        removed
    }

    /// Snapshot of the connection ids currently bound to `token`.
    pub async fn members(&self, token: &TrackingToken) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .groups
            .get(token)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every live connection id.
    pub async fn all_connections(&self) -> Vec<ConnectionId> {
        self.inner.read().await.connections.keys().cloned().collect()
    }

    /// Send a message to one connection.
    ///
    /// The connection's sender is cloned under the read lock and used after
    /// the lock is released. Never waits on a slow client: a full queue
    /// fails with [`SendError::Backlogged`].
    pub async fn send(&self, conn_id: &str, message: Message) -> Result<(), SendError> {
        let sender = self
            .inner
            .read()
            .await
            .connections
            .get(conn_id)
            .map(|conn| conn.sender.clone())
            .ok_or_else(|| SendError::UnknownConnection(conn_id.to_string()))?;

        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Backlogged(conn_id.to_string()),
            TrySendError::Closed(_) => SendError::Closed(conn_id.to_string()),
        })
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Lossy: connections that are closed, or whose queue is down to
    /// [`DIRECT_SEND_RESERVE`] free slots, are skipped. Returns the number of
    /// connections the message was handed to.
    pub async fn broadcast(&self, message: Message) -> usize {
        let senders = self.snapshot_senders().await;
        let reached = senders
            .iter()
            .filter(|sender| sender.capacity() > DIRECT_SEND_RESERVE)
            .filter(|sender| sender.try_send(message.clone()).is_ok())
            .count();
        if reached < senders.len() {
            tracing::debug!(
                skipped = senders.len() - reached,
                "Broadcast skipped closed or backlogged connections",
            );
        }
        reached
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Return the number of tokens with at least one bound connection.
    pub async fn group_count(&self) -> usize {
        self.inner.read().await.groups.len()
    }

    /// Send a Close frame to every connection, then clear all state.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        for conn in inner.connections.values() {
            let _ = conn.sender.try_send(Message::Close(None));
        }
        inner.connections.clear();
        inner.groups.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        for sender in self.snapshot_senders().await {
            let _ = sender.try_send(Message::Ping(Bytes::new()));
        }
    }

    async fn snapshot_senders(&self) -> Vec<WsSender> {
        self.inner
            .read()
            .await
            .connections
            .values()
            .map(|conn| conn.sender.clone())
            .collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop `conn_id` from `token`'s group, pruning the group once empty.
fn remove_member(
    groups: &mut HashMap<TrackingToken, HashSet<ConnectionId>>,
    token: &TrackingToken,
    conn_id: &str,
) {
    if let Some(members) = groups.get_mut(token) {
        members.remove(conn_id);
        if members.is_empty() {
            groups.remove(token);
        }
    }
}

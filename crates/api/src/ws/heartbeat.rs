use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::registry::ConnectionRegistry;

/// Spawn a background task that sends periodic Ping frames to all connected
/// WebSocket clients.
///
/// The task runs until `cancel` is triggered. Panics if `interval` is zero.
pub fn start_heartbeat(
    connections: Arc<ConnectionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    assert!(!interval.is_zero(), "heartbeat interval must be non-zero");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; nobody needs a ping yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Heartbeat stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let count = connections.connection_count().await;
                    tracing::debug!(count, "WebSocket heartbeat ping");
                    connections.ping_all().await;
                }
            }
        }
    })
}

//! Periodic scene broadcast.
//!
//! [`SceneBroadcaster`] pushes a `ReceiveSceneUpdate` event to every live
//! connection at a fixed period, independent of jobs and token groups. The
//! tick counter and rotation live in a [`SceneState`] that only the running
//! tick task mutates; it is handed back on stop so a restart continues the
//! sequence.

use std::sync::Arc;
use std::time::Duration;

use hyperspace_core::events::EVENT_RECEIVE_SCENE_UPDATE;
use hyperspace_core::scene::SceneState;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionRegistry;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<SceneState>,
}

struct Inner {
    /// Scene state while stopped. Moved into the tick task while running.
    state: SceneState,
    running: Option<Running>,
}

/// Fixed-period broadcaster with `Stopped -> Running -> Stopped` lifecycle.
pub struct SceneBroadcaster {
    connections: Arc<ConnectionRegistry>,
    period: Duration,
    inner: Mutex<Inner>,
}

impl SceneBroadcaster {
    /// Create a stopped broadcaster ticking every `period` once started.
    ///
    /// Panics if `period` is zero.
    pub fn new(connections: Arc<ConnectionRegistry>, period: Duration) -> Self {
        assert!(!period.is_zero(), "scene tick period must be non-zero");
        Self {
            connections,
            period,
            inner: Mutex::new(Inner {
                state: SceneState::new(),
                running: None,
            }),
        }
    }

    /// Start ticking. The first tick fires immediately.
    ///
    /// Returns `false` if the broadcaster was already running.
    pub async fn start(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.running.is_some() {
            return false;
        }

        let cancel = CancellationToken::new();
        let state = std::mem::take(&mut inner.state);
        let handle = tokio::spawn(run_ticks(
            Arc::clone(&self.connections),
            self.period,
            state,
            cancel.clone(),
        ));
        inner.running = Some(Running { cancel, handle });

        tracing::info!(period_ms = self.period.as_millis() as u64, "Scene broadcaster started");
        true
    }

    /// Stop ticking and wait for the tick task to exit.
    ///
    /// No tick fires after this returns, including one that was already due.
    /// Returns `false` if the broadcaster was not running.
    pub async fn stop(&self) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(Running { cancel, handle }) = inner.running.take() else {
            return false;
        };

        cancel.cancel();
        match handle.await {
            Ok(state) => {
                tracing::info!(ticks = state.tick(), "Scene broadcaster stopped");
                inner.state = state;
            }
            Err(e) => {
                tracing::error!(error = %e, "Scene broadcaster task failed, state reset");
                inner.state = SceneState::new();
            }
        }
        true
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running.is_some()
    }
}

/// Tick loop. Returns the advanced state once cancelled.
async fn run_ticks(
    connections: Arc<ConnectionRegistry>,
    period: Duration,
    mut state: SceneState,
    cancel: CancellationToken,
) -> SceneState {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            // Cancellation wins over a tick that is due at the same time.
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let event = state.advance();
                match ServerEvent::new(EVENT_RECEIVE_SCENE_UPDATE, &event).to_message() {
                    Ok(message) => {
                        let reached = connections.broadcast(message).await;
                        tracing::trace!(tick = state.tick(), reached, "Scene update broadcast");
                    }
                    Err(e) => {
                        tracing::error!(tick = state.tick(), error = %e, "Failed to encode scene update");
                    }
                }
            }
        }
    }

    state
}

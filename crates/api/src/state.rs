use std::sync::Arc;

use hyperspace_core::executor::{JobCompletion, JobExecutor};
use hyperspace_core::shape::JobProcessor;
use hyperspace_core::token::TokenIssuer;
use tokio::sync::mpsc;

use crate::config::ServerConfig;
use crate::correlation::CorrelationRouter;
use crate::ws::ConnectionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Live hub connections and their tracking-token groups.
    pub connections: Arc<ConnectionRegistry>,
    /// Binds connections to tokens and delivers job outcomes.
    pub correlation: Arc<CorrelationRouter>,
    /// Bounded pool running submitted jobs.
    pub executor: Arc<JobExecutor>,
    /// Tracking token source for new submissions.
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Wire the core components together.
    ///
    /// Returns the state plus the executor's completion receiver, which the
    /// caller must hand to [`CorrelationRouter::run`] for results to be
    /// delivered.
    pub fn new(
        config: ServerConfig,
        processor: Arc<dyn JobProcessor>,
    ) -> (Self, mpsc::UnboundedReceiver<JobCompletion>) {
        let connections = Arc::new(ConnectionRegistry::new());
        let correlation = Arc::new(CorrelationRouter::new(Arc::clone(&connections)));
        let (executor, completions) = JobExecutor::new(processor, config.job_workers);

        let state = Self {
            config: Arc::new(config),
            connections,
            correlation,
            executor: Arc::new(executor),
            tokens: TokenIssuer::new(),
        };
        (state, completions)
    }
}

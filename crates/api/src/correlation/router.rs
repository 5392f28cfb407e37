//! Token-to-connection delivery.
//!
//! Delivery is best-effort: membership is snapshotted when the job finishes,
//! a token nobody is bound to drops the outcome, and a member that vanishes
//! between snapshot and send is skipped without affecting the others.

use std::sync::Arc;

use axum::extract::ws::Message;
use hyperspace_core::error::CoreError;
use hyperspace_core::events::{EVENT_SHAPE_PROCESSING_COMPLETE, EVENT_SHAPE_PROCESSING_FAILED};
use hyperspace_core::executor::{JobCompletion, JobOutcome};
use hyperspace_core::types::TrackingToken;
use tokio::sync::mpsc;

use crate::ws::protocol::{JobFailedPayload, ServerEvent};
use crate::ws::ConnectionRegistry;

/// Routes job outcomes to the connections bound to their tokens.
pub struct CorrelationRouter {
    connections: Arc<ConnectionRegistry>,
}

impl CorrelationRouter {
    pub fn new(connections: Arc<ConnectionRegistry>) -> Self {
        Self { connections }
    }

    /// Bind `conn_id` to `token` on behalf of an `AssociateWithTrackingId`
    /// call.
    ///
    /// Any connection that presents a token may bind to it; possession of
    /// the token is the only credential.
    pub async fn bind_request(&self, conn_id: &str, token: &TrackingToken) -> Result<(), CoreError> {
        if token.as_str().trim().is_empty() {
            return Err(CoreError::Validation(
                "trackingId must not be empty".to_string(),
            ));
        }

        let is_new = self.connections.bind(conn_id, token).await?;
        tracing::info!(
            conn_id,
            tracking_id = %token,
            is_new,
            "Client is now tracking session",
        );
        Ok(())
    }

    /// Deliver a job outcome to every connection bound to `token`.
    ///
    /// Returns the number of connections the outcome was handed to. Zero
    /// bound connections is not an error: the outcome is dropped.
    pub async fn deliver(&self, token: &TrackingToken, outcome: JobOutcome) -> usize {
        let members = self.connections.members(token).await;
        if members.is_empty() {
            tracing::debug!(tracking_id = %token, "No connections bound, outcome dropped");
            return 0;
        }

        let (event, message) = match encode_outcome(token, &outcome) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::error!(tracking_id = %token, error = %e, "Failed to encode job outcome");
                return 0;
            }
        };

        let mut delivered = 0;
        for conn_id in &members {
            match self.connections.send(conn_id, message.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        tracking_id = %token,
                        conn_id = %conn_id,
                        error = %e,
                        "Skipping member",
                    );
                }
            }
        }

        tracing::info!(
            tracking_id = %token,
            event,
            bound = members.len(),
            delivered,
            "Job outcome delivered",
        );
        delivered
    }

    /// Consume executor completions until the channel closes.
    pub async fn run(self: Arc<Self>, mut completions: mpsc::UnboundedReceiver<JobCompletion>) {
        while let Some(JobCompletion { token, outcome }) = completions.recv().await {
            self.deliver(&token, outcome).await;
        }
        tracing::info!("Completion channel closed, correlation router shutting down");
    }
}

/// Encode an outcome once so every member receives the same frame.
fn encode_outcome(
    token: &TrackingToken,
    outcome: &JobOutcome,
) -> Result<(&'static str, Message), serde_json::Error> {
    match outcome {
        JobOutcome::Completed(shape) => {
            let message = ServerEvent::new(EVENT_SHAPE_PROCESSING_COMPLETE, shape).to_message()?;
            Ok((EVENT_SHAPE_PROCESSING_COMPLETE, message))
        }
        JobOutcome::Failed(error) => {
            let payload = JobFailedPayload {
                tracking_id: token,
                error,
            };
            let message = ServerEvent::new(EVENT_SHAPE_PROCESSING_FAILED, payload).to_message()?;
            Ok((EVENT_SHAPE_PROCESSING_FAILED, message))
        }
    }
}

//! JSON frames exchanged over the hub WebSocket.
//!
//! Server → client: `{"event": "<name>", "payload": <json>}`.
//! Client → server: `{"method": "AssociateWithTrackingId", "trackingId": "<token>"}`.

use axum::extract::ws::Message;
use hyperspace_core::types::TrackingToken;
use serde::{Deserialize, Serialize};

/// Outbound event envelope.
#[derive(Debug, Serialize)]
pub struct ServerEvent<'a, T: Serialize> {
    pub event: &'a str,
    pub payload: T,
}

impl<'a, T: Serialize> ServerEvent<'a, T> {
    pub fn new(event: &'a str, payload: T) -> Self {
        Self { event, payload }
    }

    /// Encode as a WebSocket text frame.
    pub fn to_message(&self) -> Result<Message, serde_json::Error> {
        Ok(Message::Text(serde_json::to_string(self)?.into()))
    }
}

/// Hub methods a client may invoke.
#[derive(Debug, Deserialize)]
#[serde(tag = "method")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    AssociateWithTrackingId { tracking_id: TrackingToken },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload<'a> {
    pub connection_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociatedPayload<'a> {
    pub tracking_id: &'a TrackingToken,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFailedPayload<'a> {
    pub tracking_id: &'a TrackingToken,
    pub error: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload<'a> {
    pub code: &'a str,
    pub message: &'a str,
}

//! WebSocket hub for real-time delivery.
//!
//! Provides the connection registry (connections plus tracking-token
//! groups), the hub wire protocol, heartbeat pings, and the HTTP upgrade
//! handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod protocol;
pub mod registry;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use registry::{ConnectionRegistry, SendError, DIRECT_SEND_RESERVE, OUTBOUND_QUEUE_CAPACITY};

//! Well-known hub event and method names.
//!
//! These must match the names the browser client listens for and invokes;
//! changing any of them breaks interop with existing clients.

/// Job result delivered to every connection bound to the job's token.
pub const EVENT_SHAPE_PROCESSING_COMPLETE: &str = "ShapeProcessingComplete";

/// Job failure delivered to every connection bound to the job's token.
pub const EVENT_SHAPE_PROCESSING_FAILED: &str = "ShapeProcessingFailed";

/// Periodic scene snapshot pushed to all connections.
pub const EVENT_RECEIVE_SCENE_UPDATE: &str = "ReceiveSceneUpdate";

/// Sent once to a connection right after it is registered.
pub const EVENT_CONNECTED: &str = "Connected";

/// Acknowledges a successful bind request.
pub const EVENT_ASSOCIATED: &str = "AssociatedWithTrackingId";

/// Reports a malformed frame or a rejected bind request.
pub const EVENT_ERROR: &str = "Error";

/// Hub method a client invokes to bind its connection to a tracking token.
pub const METHOD_ASSOCIATE_WITH_TRACKING_ID: &str = "AssociateWithTrackingId";

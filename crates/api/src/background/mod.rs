//! Background tasks and scheduled jobs.
//!
//! Each submodule owns a long-running async loop spawned via
//! `tokio::spawn` and stopped through a [`CancellationToken`].
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

pub mod scene_broadcaster;

pub use scene_broadcaster::SceneBroadcaster;

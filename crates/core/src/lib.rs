//! Domain core for the Hyperspace correlation server.
//!
//! - [`token`]: tracking token issuance.
//! - [`executor`]: the bounded job executor and its completion channel.
//! - [`shape`]: the job processor seam and the simulated shape generator.
//! - [`scene`]: scene snapshots for the periodic broadcaster.
//! - [`events`]: hub event and method names shared with clients.

pub mod error;
pub mod events;
pub mod executor;
pub mod scene;
pub mod shape;
pub mod token;
pub mod types;

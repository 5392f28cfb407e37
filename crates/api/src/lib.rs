//! Hyperspace API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! WebSocket hub, job correlation, and background broadcasting) so
//! integration tests and the binary entrypoint can both access them.

pub mod app;
pub mod background;
pub mod config;
pub mod correlation;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws;

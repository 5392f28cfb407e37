//! Job-result correlation.
//!
//! The [`CorrelationRouter`] binds hub connections to tracking tokens and
//! delivers each finished job's outcome to exactly the connections bound to
//! its token.

pub mod router;

pub use router::CorrelationRouter;

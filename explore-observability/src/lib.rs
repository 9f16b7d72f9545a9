//! # explore-observability
//!
//! Structured tracing with span definitions and event helpers, plus a
//! bounded query performance log that also keeps failed queries.

pub mod query_log;
pub mod tracing_setup;

pub use query_log::{ComponentLatency, ComponentStats, QueryLog, QueryLogEntry};
pub use tracing_setup::init_tracing;

#[doc(hidden)]
pub use tracing;

//! # explore-core
//!
//! Foundation crate for the explore engine.
//! Defines the retrieval config model, filter language, query and result
//! types, connector traits, errors, and defaults.
//! Every other crate in the workspace depends on this.

pub mod cancellation;
pub mod config;
pub mod constants;
pub mod errors;
pub mod filter;
pub mod models;
pub mod traits;

// Re-export the most commonly used types at the crate root.
pub use cancellation::CancellationToken;
pub use config::{ComponentType, ExploreSettings, RetrievalConfig};
pub use errors::{ExploreError, ExploreResult};
pub use filter::{Filter, FilterOp, Predicate};
pub use models::{CandidateId, ExploreResponse, RuntimeQuery, ScoredCandidate};

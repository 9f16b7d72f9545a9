pub mod candidate;
pub mod query;
pub mod response;

pub use candidate::{CandidateId, ComponentHit, ComponentScore, ScoredCandidate};
pub use query::RuntimeQuery;
pub use response::{ExploreResponse, ResultItem};

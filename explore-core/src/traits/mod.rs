mod connector;
mod embedder;
mod token_counter;

pub use connector::{BackendConnector, BackendHit};
pub use embedder::QueryEmbedder;
pub use token_counter::TokenCounter;

//! # explore-tokens
//!
//! Token counting functions for the budget allocator.
//! [`WordCounter`] is the default; [`TiktokenCounter`] gives exact
//! `cl100k_base` counts and caches them per blake3 content hash.

pub mod tiktoken;
pub mod words;

use std::sync::Arc;

use explore_core::config::{EngineConfig, TokenCounterKind};
use explore_core::errors::ExploreResult;
use explore_core::traits::TokenCounter;

pub use tiktoken::TiktokenCounter;
pub use words::WordCounter;

/// Build the counter selected by the engine config.
pub fn counter_for(config: &EngineConfig) -> ExploreResult<Arc<dyn TokenCounter>> {
    Ok(match config.token_counter {
        TokenCounterKind::Words => Arc::new(WordCounter),
        TokenCounterKind::Tiktoken => {
            Arc::new(TiktokenCounter::new(config.token_cache_capacity)?)
        }
    })
}

use std::sync::Arc;

use explore_core::errors::{ExploreError, ExploreResult};
use explore_core::traits::TokenCounter;
use moka::sync::Cache;
use tiktoken_rs::CoreBPE;

/// Accurate token counter wrapping tiktoken's cl100k_base tokenizer.
/// Caches results per blake3 content hash.
pub struct TiktokenCounter {
    bpe: Arc<CoreBPE>,
    cache: Cache<String, usize>,
}

impl TiktokenCounter {
    /// Create a counter with the given cache capacity.
    pub fn new(cache_capacity: u64) -> ExploreResult<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| ExploreError::Tokenizer {
            reason: e.to_string(),
        })?;
        Ok(Self {
            bpe: Arc::new(bpe),
            cache: Cache::new(cache_capacity),
        })
    }

    /// Count tokens without consulting the cache.
    pub fn count_uncached(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        let hash = blake3::hash(text.as_bytes()).to_hex().to_string();
        self.cache.get_with(hash, || self.count_uncached(text))
    }

    fn name(&self) -> &'static str {
        "tiktoken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_equals_uncached() {
        let counter = TiktokenCounter::new(100).unwrap();
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(counter.count(text), counter.count_uncached(text));
        assert_eq!(counter.count(text), counter.count(text));
    }

    #[test]
    fn empty_string_is_zero() {
        let counter = TiktokenCounter::new(10).unwrap();
        assert_eq!(counter.count(""), 0);
    }
}

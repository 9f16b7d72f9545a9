use serde::{Deserialize, Serialize};

use super::defaults;

/// Which token counting function the allocator uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCounterKind {
    /// Whitespace-separated word count.
    #[default]
    Words,
    /// tiktoken `cl100k_base`.
    Tiktoken,
}

/// Engine-wide runtime settings (independent of any single explore).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for a single component call; the query deadline may shorten it.
    pub per_call_timeout_ms: u64,
    /// Maximum cached query results across all explores.
    pub cache_capacity: u64,
    /// How often queued write-behind invalidations are applied.
    pub write_behind_flush_ms: u64,
    pub token_counter: TokenCounterKind,
    /// Content-hash cache size for the tiktoken counter.
    pub token_cache_capacity: u64,
    /// Maximum retained query log entries.
    pub query_log_capacity: usize,
    /// Queries slower than this are logged at warn level.
    pub slow_query_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            per_call_timeout_ms: defaults::DEFAULT_PER_CALL_TIMEOUT_MS,
            cache_capacity: defaults::DEFAULT_CACHE_CAPACITY,
            write_behind_flush_ms: defaults::DEFAULT_WRITE_BEHIND_FLUSH_MS,
            token_counter: TokenCounterKind::default(),
            token_cache_capacity: defaults::DEFAULT_TOKEN_CACHE_CAPACITY,
            query_log_capacity: defaults::DEFAULT_QUERY_LOG_CAPACITY,
            slow_query_ms: defaults::DEFAULT_SLOW_QUERY_MS,
        }
    }
}

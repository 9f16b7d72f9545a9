// Single source of truth for all default values.

// --- Engine ---
pub const DEFAULT_PER_CALL_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_WRITE_BEHIND_FLUSH_MS: u64 = 250;
pub const DEFAULT_TOKEN_CACHE_CAPACITY: u64 = 10_000;
pub const DEFAULT_QUERY_LOG_CAPACITY: usize = 10_000;
pub const DEFAULT_SLOW_QUERY_MS: u64 = 1_000;

// --- Explore limits ---
pub const DEFAULT_RESULT_LIMIT: usize = 10;
pub const DEFAULT_MAX_RESULT_LIMIT: usize = 100;

// --- Explore cache ---
pub const DEFAULT_CACHE_ENABLED: bool = true;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300; // 5 minutes

// --- Components ---
pub const DEFAULT_VECTOR_K: usize = 20;
pub const DEFAULT_VECTOR_THRESHOLD: f64 = 0.0;
pub const DEFAULT_KEYWORD_BOOST: f64 = 1.0;
pub const DEFAULT_GRAPH_DEPTH: u32 = 2;
pub const DEFAULT_TIMESTAMP_FIELD: &str = "timestamp";
pub const DEFAULT_IMPORTANCE_FIELD: &str = "importance";
pub const DEFAULT_COMPONENT_WEIGHT: f64 = 1.0;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_JSON_LOGS: bool = false;

pub(crate) fn vector_k() -> usize {
    DEFAULT_VECTOR_K
}

pub(crate) fn vector_threshold() -> f64 {
    DEFAULT_VECTOR_THRESHOLD
}

pub(crate) fn keyword_boost() -> f64 {
    DEFAULT_KEYWORD_BOOST
}

pub(crate) fn importance_field() -> String {
    DEFAULT_IMPORTANCE_FIELD.to_string()
}

pub(crate) fn component_weight() -> f64 {
    DEFAULT_COMPONENT_WEIGHT
}

pub(crate) fn version() -> u32 {
    1
}

pub(crate) fn enabled() -> bool {
    true
}

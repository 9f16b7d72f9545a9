//! Structured log events for key engine operations.
//!
//! Each function emits a `tracing` event with structured fields.

/// Log a finished plan.
pub fn query_planned(explore: &str, strategy: &str, calls: usize, limit: usize) {
    tracing::debug!(
        event = "query_planned",
        explore = %explore,
        strategy = %strategy,
        calls = calls,
        limit = limit,
        "query planned"
    );
}

/// Log an optional source omitted after a transient failure.
pub fn component_degraded(component: &str, source: &str, failure: &str) {
    tracing::warn!(
        event = "component_degraded",
        component = %component,
        source = %source,
        failure = %failure,
        "optional source omitted"
    );
}

pub fn cache_hit(explore: &str, key: &str) {
    tracing::debug!(event = "cache_hit", explore = %explore, key = %key, "cache hit");
}

pub fn cache_miss(explore: &str, key: &str) {
    tracing::debug!(event = "cache_miss", explore = %explore, key = %key, "cache miss");
}

/// Log cache entries removed by an invalidation.
pub fn cache_invalidated(reason: &str, target: &str, removed: usize) {
    tracing::info!(
        event = "cache_invalidated",
        reason = %reason,
        target = %target,
        removed = removed,
        "cache entries invalidated"
    );
}

/// Log candidates dropped because they did not fit the token budget.
pub fn budget_truncated(explore: &str, max_tokens: usize, used: usize, skipped: usize) {
    tracing::debug!(
        event = "budget_truncated",
        explore = %explore,
        max_tokens = max_tokens,
        used = used,
        skipped = skipped,
        "token budget truncated results"
    );
}

/// Log a completed query.
pub fn query_completed(
    explore: &str,
    strategy: &str,
    latency_ms: u64,
    results: usize,
    cache_hit: bool,
    degraded: bool,
) {
    tracing::info!(
        event = "query_completed",
        explore = %explore,
        strategy = %strategy,
        latency_ms = latency_ms,
        results = results,
        cache_hit = cache_hit,
        degraded = degraded,
        "query completed"
    );
}

/// Log a failed query with its error kind.
pub fn query_failed(explore: &str, error_kind: &str, latency_ms: u64, error: &str) {
    tracing::warn!(
        event = "query_failed",
        explore = %explore,
        error_kind = %error_kind,
        latency_ms = latency_ms,
        error = %error,
        "query failed"
    );
}

/// Log a query that took longer than the slow threshold.
pub fn slow_query(explore: &str, latency_ms: u64, threshold_ms: u64) {
    tracing::warn!(
        event = "slow_query",
        explore = %explore,
        latency_ms = latency_ms,
        threshold_ms = threshold_ms,
        "slow query"
    );
}

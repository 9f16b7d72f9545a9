//! Span definitions per operation: query, plan, component call, cache.

/// Span around a whole explore query.
#[macro_export]
macro_rules! query_span {
    ($explore:expr, $query_id:expr) => {
        $crate::tracing::info_span!("explore.query", explore = %$explore, query_id = %$query_id)
    };
}

/// Span around planning.
#[macro_export]
macro_rules! plan_span {
    ($explore:expr, $strategy:expr) => {
        $crate::tracing::debug_span!("explore.plan", explore = %$explore, strategy = %$strategy)
    };
}

/// Span around a single component call against one source.
#[macro_export]
macro_rules! component_span {
    ($component:expr, $ordinal:expr, $source:expr) => {
        $crate::tracing::debug_span!(
            "explore.component",
            component = %$component,
            ordinal = $ordinal,
            source = %$source
        )
    };
}

/// Span around a cache lookup or fill.
#[macro_export]
macro_rules! cache_span {
    ($key:expr) => {
        $crate::tracing::debug_span!("explore.cache", key = %$key)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const QUERY: &str = "explore.query";
    pub const PLAN: &str = "explore.plan";
    pub const COMPONENT: &str = "explore.component";
    pub const CACHE: &str = "explore.cache";
}

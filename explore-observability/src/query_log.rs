//! Query performance logging: explore, strategy, latency, per-component
//! latency, result count, tokens used, cache hit, degradation, and the
//! error kind of failed queries.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use explore_core::config::{defaults, ComponentType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wall time of one planned component call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentLatency {
    pub component: ComponentType,
    pub source: String,
    pub latency: Duration,
    pub ok: bool,
}

/// A single query log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub query_id: Uuid,
    pub explore: String,
    pub strategy: String,
    pub latency: Duration,
    pub components: Vec<ComponentLatency>,
    pub result_count: usize,
    pub tokens_used: usize,
    pub cache_hit: bool,
    pub degraded: bool,
    /// Error kind when the query failed.
    pub error: Option<String>,
    pub timestamp_epoch_ms: i64,
}

impl QueryLogEntry {
    /// Create a new entry with the timestamp set to now.
    pub fn new(
        query_id: Uuid,
        explore: impl Into<String>,
        strategy: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            query_id,
            explore: explore.into(),
            strategy: strategy.into(),
            latency,
            components: Vec::new(),
            result_count: 0,
            tokens_used: 0,
            cache_hit: false,
            degraded: false,
            error: None,
            timestamp_epoch_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_components(mut self, components: Vec<ComponentLatency>) -> Self {
        self.components = components;
        self
    }

    pub fn with_results(mut self, result_count: usize, tokens_used: usize) -> Self {
        self.result_count = result_count;
        self.tokens_used = tokens_used;
        self
    }

    pub fn with_flags(mut self, cache_hit: bool, degraded: bool) -> Self {
        self.cache_hit = cache_hit;
        self.degraded = degraded;
        self
    }

    pub fn with_error(mut self, kind: impl Into<String>) -> Self {
        self.error = Some(kind.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Aggregate over every logged call of one component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStats {
    pub component: ComponentType,
    pub calls: usize,
    pub errors: usize,
    pub avg_latency: Duration,
    pub max_latency: Duration,
}

/// Bounded query log; the oldest entries are dropped first.
#[derive(Debug, Clone)]
pub struct QueryLog {
    entries: VecDeque<QueryLogEntry>,
    max_entries: usize,
}

impl Default for QueryLog {
    fn default() -> Self {
        Self::with_capacity(defaults::DEFAULT_QUERY_LOG_CAPACITY)
    }
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a query.
    pub fn record(&mut self, entry: QueryLogEntry) {
        tracing::debug!(
            event = "query_logged",
            query_id = %entry.query_id,
            explore = %entry.explore,
            latency_ms = u64::try_from(entry.latency.as_millis()).unwrap_or(u64::MAX),
            result_count = entry.result_count,
            cache_hit = entry.cache_hit,
            error = entry.error.as_deref().unwrap_or(""),
            "query logged"
        );

        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &QueryLogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&QueryLogEntry> {
        self.entries.back()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Failed queries, oldest first.
    pub fn errors(&self) -> impl Iterator<Item = &QueryLogEntry> {
        self.entries.iter().filter(|e| e.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Fraction of successful queries served from the cache.
    pub fn cache_hit_rate(&self) -> f64 {
        let (served, hits) = self
            .entries
            .iter()
            .filter(|e| !e.is_error())
            .fold((0usize, 0usize), |(n, h), e| (n + 1, h + usize::from(e.cache_hit)));
        if served == 0 {
            return 0.0;
        }
        hits as f64 / served as f64
    }

    /// Queries at or above `threshold`, slowest first.
    pub fn slow_queries(&self, threshold: Duration) -> Vec<&QueryLogEntry> {
        let mut slow: Vec<&QueryLogEntry> =
            self.entries.iter().filter(|e| e.latency >= threshold).collect();
        slow.sort_by(|a, b| b.latency.cmp(&a.latency));
        slow
    }

    /// Per component type: call count, failed calls, average and worst latency.
    pub fn component_stats(&self) -> Vec<ComponentStats> {
        let mut grouped: BTreeMap<ComponentType, Vec<&ComponentLatency>> = BTreeMap::new();
        for call in self.entries.iter().flat_map(|e| e.components.iter()) {
            grouped.entry(call.component).or_default().push(call);
        }
        grouped
            .into_iter()
            .map(|(component, calls)| {
                let total: Duration = calls.iter().map(|c| c.latency).sum();
                ComponentStats {
                    component,
                    calls: calls.len(),
                    errors: calls.iter().filter(|c| !c.ok).count(),
                    avg_latency: total / u32::try_from(calls.len()).unwrap_or(u32::MAX),
                    max_latency: calls.iter().map(|c| c.latency).max().unwrap_or_default(),
                }
            })
            .collect()
    }

    /// Average latency across all logged queries.
    pub fn avg_latency(&self) -> Duration {
        if self.entries.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.entries.iter().map(|e| e.latency).sum();
        total / u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    /// Latency at the given percentile (0.0 to 1.0).
    pub fn latency_percentile(&self, p: f64) -> Duration {
        if self.entries.is_empty() {
            return Duration::ZERO;
        }
        let mut latencies: Vec<Duration> = self.entries.iter().map(|e| e.latency).collect();
        latencies.sort();
        let last = latencies.len() - 1;
        let idx = ((p.clamp(0.0, 1.0) * last as f64).round() as usize).min(last);
        latencies[idx]
    }
}

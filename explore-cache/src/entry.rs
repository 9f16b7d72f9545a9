use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use explore_core::config::{CacheSettings, InvalidationMode, InvalidationScope};
use explore_core::models::{CandidateId, ExploreResponse};

use crate::key::CacheKey;

/// A cached response plus what it depends on.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    /// Explore name (not id), so a reload can drop every version.
    pub explore: String,
    pub response: ExploreResponse,
    /// Source aliases the plan touched.
    pub sources: BTreeSet<String>,
    /// Records present in the response.
    pub records: BTreeSet<CandidateId>,
    pub created_at: DateTime<Utc>,
    created: Instant,
    pub ttl: Duration,
    pub mode: InvalidationMode,
    pub scope: InvalidationScope,
}

impl CacheEntry {
    pub fn new(
        key: CacheKey,
        response: ExploreResponse,
        sources: BTreeSet<String>,
        settings: &CacheSettings,
    ) -> Self {
        let records = response.ids().into_iter().collect();
        Self {
            key,
            explore: response.explore.clone(),
            response,
            sources,
            records,
            created_at: Utc::now(),
            created: Instant::now(),
            ttl: Duration::from_secs(settings.ttl_secs),
            mode: settings.invalidation,
            scope: settings.scope,
        }
    }

    /// Override the TTL; mostly useful with sub-second values in tests.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.created.elapsed() >= self.ttl
    }

    /// Degraded responses are shared with waiters but never stored.
    pub fn is_cacheable(&self) -> bool {
        !self.response.degraded && !self.ttl.is_zero()
    }

    /// Whether a change to `source/record_id` affects this entry.
    pub fn depends_on(&self, source: &str, record_id: &str) -> bool {
        if !self.sources.contains(source) {
            return false;
        }
        match self.scope {
            InvalidationScope::Source => true,
            InvalidationScope::Record => self
                .records
                .contains(&CandidateId::new(source, record_id)),
        }
    }
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::candidate::{CandidateId, ComponentScore};

/// One ranked, rendered result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub source: String,
    pub record_id: String,
    pub fused_score: f64,
    pub breakdown: Vec<ComponentScore>,
    /// Selected and renamed fields.
    pub fields: Map<String, Value>,
    /// Token cost of the rendered fields.
    pub tokens: usize,
}

impl ResultItem {
    pub fn id(&self) -> CandidateId {
        CandidateId::new(self.source.clone(), self.record_id.clone())
    }
}

/// Output of one explore query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreResponse {
    pub query_id: Uuid,
    pub explore: String,
    pub version: u32,
    pub strategy: String,
    pub items: Vec<ResultItem>,
    pub tokens_used: usize,
    pub cache_hit: bool,
    /// True when optional sources failed and were omitted.
    pub degraded: bool,
    pub omitted_sources: Vec<String>,
}

impl ExploreResponse {
    pub fn ids(&self) -> Vec<CandidateId> {
        self.items.iter().map(ResultItem::id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

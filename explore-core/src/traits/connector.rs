use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DistanceMetric;
use crate::errors::BackendError;
use crate::filter::Filter;

/// A candidate returned by a backend with its backend-native score.
///
/// Native score meaning per operation:
/// - `vector_search`: similarity (cosine, dot) or distance (euclidean)
/// - `keyword_search`: unnormalized lexical relevance
/// - `graph_traverse`: hop distance from the nearest seed
/// - `scalar_lookup`: the numeric field value (timestamps as unix seconds)
/// - `scan`: unused, conventionally 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendHit {
    pub record_id: String,
    pub score: f64,
    pub timestamp: Option<DateTime<Utc>>,
    /// Record payload used for field rendering.
    pub fields: Map<String, Value>,
}

impl BackendHit {
    pub fn new(record_id: impl Into<String>, score: f64) -> Self {
        Self {
            record_id: record_id.into(),
            score,
            timestamp: None,
            fields: Map::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }
}

/// Capability-typed access to the stores behind each source alias.
///
/// Every operation receives the effective filter of the planned call and
/// must only return records that satisfy it.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Top-`k` nearest records. `threshold` is already in the metric's native
    /// space: a minimum score, or a maximum distance for euclidean.
    async fn vector_search(
        &self,
        source: &str,
        embedding: &[f32],
        k: usize,
        threshold: f64,
        metric: DistanceMetric,
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError>;

    async fn keyword_search(
        &self,
        source: &str,
        fields: &[String],
        text: &str,
        boost: f64,
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError>;

    /// Breadth-first traversal from `seeds`, at most `depth` hops, following
    /// only `edge_types` (all edge types when empty).
    async fn graph_traverse(
        &self,
        source: &str,
        seeds: &[String],
        depth: u32,
        edge_types: &[String],
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError>;

    /// Every record matching `filter`, scored by the numeric value of `field`.
    /// Records without a numeric `field` are omitted.
    async fn scalar_lookup(
        &self,
        source: &str,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError>;

    /// Every record matching `filter`, unscored.
    async fn scan(&self, source: &str, filter: &Filter) -> Result<Vec<BackendHit>, BackendError>;
}

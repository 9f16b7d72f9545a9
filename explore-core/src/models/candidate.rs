use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ComponentType;

/// Identity of a candidate: source alias plus record id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId {
    pub source: String,
    pub record_id: String,
}

impl CandidateId {
    pub fn new(source: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            record_id: record_id.into(),
        }
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.record_id)
    }
}

/// One record scored by one component executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHit {
    pub record_id: String,
    /// Component-normalized score in [0, 1].
    pub raw_score: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub fields: Map<String, Value>,
}

impl ComponentHit {
    pub fn new(record_id: impl Into<String>, raw_score: f64) -> Self {
        Self {
            record_id: record_id.into(),
            raw_score,
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

/// Per-component contribution to a fused score (explainability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub component: ComponentType,
    /// Declaration index of the component within its strategy.
    pub ordinal: usize,
    pub raw: f64,
    /// Normalized weight of the planned call.
    pub weight: f64,
}

impl ComponentScore {
    pub fn weighted(&self) -> f64 {
        self.weight * self.raw
    }
}

/// A deduplicated candidate with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: CandidateId,
    pub scores: Vec<ComponentScore>,
    pub fused_score: f64,
    pub timestamp: Option<DateTime<Utc>>,
    pub fields: Map<String, Value>,
}

impl ScoredCandidate {
    /// Raw score from the first call of the given component type, if any.
    pub fn score_for(&self, component: ComponentType) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.component == component)
            .map(|s| s.raw)
    }

    /// Earliest declaration ordinal that contributed a nonzero weighted score.
    pub fn first_contributing_ordinal(&self) -> Option<usize> {
        self.scores
            .iter()
            .filter(|s| s.weighted() > 0.0)
            .map(|s| s.ordinal)
            .min()
    }
}

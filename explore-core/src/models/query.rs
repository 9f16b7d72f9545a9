use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::filter::{Filter, Predicate};

/// A caller's request against one explore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeQuery {
    /// Explore name.
    pub explore: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Precomputed query embedding; wins over embedding `text`.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    /// Additional equality filters, ANDed onto every planned call.
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    /// Seed record ids for graph traversal.
    #[serde(default)]
    pub seeds: Vec<String>,
    /// Runtime context for procedural triggers and conditional fields.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
    /// Overall deadline, measured from the start of execution.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl RuntimeQuery {
    pub fn new(explore: impl Into<String>) -> Self {
        Self {
            explore: explore.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = Some(u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    /// Trimmed, lower-cased text; `None` when blank.
    pub fn normalized_text(&self) -> Option<String> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// Runtime filters as equality predicates, in sorted field order.
    pub fn filter(&self) -> Filter {
        self.filters
            .iter()
            .map(|(field, value)| Predicate::equals(field.clone(), value.clone()))
            .collect::<Vec<_>>()
            .into()
    }
}

//! Component Executors: one module per component type, dispatched on the
//! `ComponentKind` variant. Executors share no mutable state.

mod graph;
mod importance;
mod keyword;
mod procedural;
mod recency;
mod vector;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use explore_core::config::ComponentKind;
use explore_core::errors::ComponentError;
use explore_core::models::{ComponentHit, RuntimeQuery};
use explore_core::traits::{BackendConnector, BackendHit};
use serde_json::Value;

use crate::planner::PlannedCall;

/// Per-query inputs shared read-only by every executor.
#[derive(Debug, Clone)]
pub struct QueryInputs {
    /// Normalized query text.
    pub text: Option<String>,
    pub embedding: Option<Vec<f32>>,
    /// Set when the embedder failed; vector calls report it.
    pub embedding_error: Option<ComponentError>,
    pub seeds: Vec<String>,
    pub context: BTreeMap<String, Value>,
    /// Reference time for recency, fixed once per query.
    pub now: DateTime<Utc>,
}

impl QueryInputs {
    pub fn from_query(query: &RuntimeQuery) -> Self {
        Self {
            text: query.normalized_text(),
            embedding: query.embedding.clone(),
            embedding_error: None,
            seeds: query.seeds.clone(),
            context: query.context.clone(),
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Run one planned call. Raw scores in the output are in [0, 1], ordered
/// best first, one hit per record.
pub async fn execute(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    inputs: &QueryInputs,
) -> Result<Vec<ComponentHit>, ComponentError> {
    if !call.context_ok {
        return Ok(Vec::new());
    }
    let hits = match &call.kind {
        ComponentKind::VectorSearch { k, threshold, metric } => {
            vector::run(connector, call, inputs, *k, *threshold, *metric).await?
        }
        ComponentKind::KeywordSearch { fields, boost } => {
            keyword::run(connector, call, inputs, fields, *boost).await?
        }
        ComponentKind::GraphTraversal { depth, edge_types } => {
            graph::run(connector, call, inputs, *depth, edge_types).await?
        }
        ComponentKind::Recency { decay_rate, field } => {
            recency::run(connector, call, inputs, *decay_rate, field.as_deref()).await?
        }
        ComponentKind::Importance { field } => importance::run(connector, call, field).await?,
        ComponentKind::ProceduralMatch { conditions } => {
            procedural::run(connector, call, inputs, conditions).await?
        }
    };
    Ok(finish(hits))
}

/// Keep the best score per record, drop non-finite scores, sort best first
/// with record id as the tie-break.
fn finish(hits: Vec<ComponentHit>) -> Vec<ComponentHit> {
    let mut best: BTreeMap<String, ComponentHit> = BTreeMap::new();
    for hit in hits.into_iter().filter(|h| h.raw_score.is_finite()) {
        match best.get(&hit.record_id) {
            Some(existing) if existing.raw_score >= hit.raw_score => {}
            _ => {
                best.insert(hit.record_id.clone(), hit);
            }
        }
    }
    let mut out: Vec<ComponentHit> = best.into_values().collect();
    out.sort_by(|a, b| {
        b.raw_score
            .total_cmp(&a.raw_score)
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
    out
}

fn to_hit(hit: BackendHit, raw_score: f64) -> ComponentHit {
    ComponentHit {
        record_id: hit.record_id,
        raw_score: raw_score.clamp(0.0, 1.0),
        timestamp: hit.timestamp,
        fields: hit.fields,
    }
}

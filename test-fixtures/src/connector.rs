//! In-memory `BackendConnector` with per-source record maps and typed-edge
//! graphs, plus failure and latency injection for degradation tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use explore_core::config::DistanceMetric;
use explore_core::errors::BackendError;
use explore_core::filter::Filter;
use explore_core::traits::{BackendConnector, BackendHit};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::record::Record;

#[derive(Debug, Default)]
struct SourceStore {
    records: BTreeMap<String, Record>,
    graph: DiGraph<String, String>,
    nodes: HashMap<String, NodeIndex>,
}

impl SourceStore {
    fn ensure_node(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.to_string());
        self.nodes.insert(id.to_string(), idx);
        idx
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a Record> + 'a {
        let context = BTreeMap::new();
        self.records
            .values()
            .filter(move |r| filter.matches(&r.fields, &context))
    }

    /// Breadth-first hop distances from `seeds`, in both edge directions.
    fn hops(&self, seeds: &[String], depth: u32, edge_types: &[String]) -> BTreeMap<String, u32> {
        let mut hops = BTreeMap::new();
        let mut queue = VecDeque::new();
        for seed in seeds {
            if !self.records.contains_key(seed) && !self.nodes.contains_key(seed) {
                continue;
            }
            if hops.insert(seed.clone(), 0).is_none() {
                if let Some(&idx) = self.nodes.get(seed) {
                    queue.push_back((idx, 0));
                }
            }
        }

        while let Some((idx, hop)) = queue.pop_front() {
            if hop >= depth {
                continue;
            }
            for direction in [Direction::Outgoing, Direction::Incoming] {
                for edge in self.graph.edges_directed(idx, direction) {
                    if !edge_types.is_empty() && !edge_types.contains(edge.weight()) {
                        continue;
                    }
                    let next = match direction {
                        Direction::Outgoing => edge.target(),
                        Direction::Incoming => edge.source(),
                    };
                    let id = &self.graph[next];
                    if !hops.contains_key(id) {
                        hops.insert(id.clone(), hop + 1);
                        queue.push_back((next, hop + 1));
                    }
                }
            }
        }
        hops
    }
}

fn hit(record: &Record, score: f64) -> BackendHit {
    let hit = BackendHit::new(record.id.clone(), score).with_fields(record.fields.clone());
    match record.timestamp {
        Some(at) => hit.with_timestamp(at),
        None => hit,
    }
}

fn native_score(metric: DistanceMetric, query: &[f32], stored: &[f32]) -> f64 {
    let dot: f64 = query
        .iter()
        .zip(stored)
        .map(|(a, b)| f64::from(*a) * f64::from(*b))
        .sum();
    match metric {
        DistanceMetric::Dot => dot,
        DistanceMetric::Cosine => {
            let norm = |v: &[f32]| v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
            let denom = norm(query) * norm(stored);
            if denom == 0.0 {
                0.0
            } else {
                dot / denom
            }
        }
        DistanceMetric::Euclidean => query
            .iter()
            .zip(stored)
            .map(|(a, b)| (f64::from(*a) - f64::from(*b)).powi(2))
            .sum::<f64>()
            .sqrt(),
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// Thread-safe in-memory backend. Locks are never held across an await.
#[derive(Debug, Default)]
pub struct InMemoryConnector {
    sources: RwLock<HashMap<String, SourceStore>>,
    failures: DashMap<String, BackendError>,
    delays: DashMap<String, Duration>,
    calls: AtomicUsize,
    calls_by_source: DashMap<String, usize>,
}

impl InMemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an empty source.
    pub fn with_source(self, alias: &str) -> Self {
        if let Ok(mut sources) = self.sources.write() {
            sources.entry(alias.to_string()).or_default();
        }
        self
    }

    pub fn with_records(self, alias: &str, records: Vec<Record>) -> Self {
        for record in records {
            self.upsert(alias, record);
        }
        self
    }

    pub fn upsert(&self, alias: &str, record: Record) {
        if let Ok(mut sources) = self.sources.write() {
            let store = sources.entry(alias.to_string()).or_default();
            store.records.insert(record.id.clone(), record);
        }
    }

    pub fn remove(&self, alias: &str, id: &str) -> Option<Record> {
        self.sources
            .write()
            .ok()?
            .get_mut(alias)?
            .records
            .remove(id)
    }

    /// Add a typed edge between two records of a source.
    pub fn link(&self, alias: &str, from: &str, to: &str, edge_type: &str) {
        if let Ok(mut sources) = self.sources.write() {
            let store = sources.entry(alias.to_string()).or_default();
            let a = store.ensure_node(from);
            let b = store.ensure_node(to);
            store.graph.add_edge(a, b, edge_type.to_string());
        }
    }

    /// Every call against `alias` fails with `error` until [`Self::recover`].
    pub fn fail_source(&self, alias: &str, error: BackendError) {
        self.failures.insert(alias.to_string(), error);
    }

    pub fn recover(&self, alias: &str) {
        self.failures.remove(alias);
    }

    /// Every call against `alias` sleeps for `delay` before answering.
    pub fn delay_source(&self, alias: &str, delay: Duration) {
        self.delays.insert(alias.to_string(), delay);
    }

    /// Total calls across all sources.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, alias: &str) -> usize {
        self.calls_by_source.get(alias).map(|c| *c).unwrap_or(0)
    }

    /// Count the call, apply injected latency, then injected failure.
    async fn enter(&self, alias: &str) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_source.entry(alias.to_string()).or_insert(0) += 1;

        let delay = self.delays.get(alias).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.get(alias) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn read<T>(
        &self,
        alias: &str,
        f: impl FnOnce(&SourceStore) -> T,
    ) -> Result<T, BackendError> {
        let sources = self.sources.read().map_err(|_| BackendError::Unavailable {
            reason: "store lock poisoned".into(),
        })?;
        let store = sources.get(alias).ok_or_else(|| BackendError::UnknownSource {
            source_alias: alias.to_string(),
        })?;
        Ok(f(store))
    }
}

#[async_trait]
impl BackendConnector for InMemoryConnector {
    async fn vector_search(
        &self,
        source: &str,
        embedding: &[f32],
        k: usize,
        threshold: f64,
        metric: DistanceMetric,
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError> {
        self.enter(source).await?;
        let mut hits = self.read(source, |store| {
            let mut hits = Vec::new();
            for record in store.matching(filter) {
                let Some(stored) = &record.embedding else {
                    continue;
                };
                if stored.len() != embedding.len() {
                    return Err(BackendError::InvalidRequest {
                        reason: format!(
                            "embedding has {} dimensions, {} stores {}",
                            embedding.len(),
                            record.id,
                            stored.len()
                        ),
                    });
                }
                let score = native_score(metric, embedding, stored);
                let passes = match metric {
                    DistanceMetric::Euclidean => score <= threshold,
                    DistanceMetric::Cosine | DistanceMetric::Dot => score >= threshold,
                };
                if passes {
                    hits.push(hit(record, score));
                }
            }
            Ok(hits)
        })??;

        hits.sort_by(|a, b| {
            let order = match metric {
                DistanceMetric::Euclidean => a.score.total_cmp(&b.score),
                DistanceMetric::Cosine | DistanceMetric::Dot => b.score.total_cmp(&a.score),
            };
            order.then_with(|| a.record_id.cmp(&b.record_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Term-frequency relevance times `boost`. Empty `fields` searches every
    /// string field.
    async fn keyword_search(
        &self,
        source: &str,
        fields: &[String],
        text: &str,
        boost: f64,
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError> {
        self.enter(source).await?;
        let terms: Vec<String> = tokens(text).collect();
        self.read(source, |store| {
            store
                .matching(filter)
                .filter_map(|record| {
                    let frequency: usize = record
                        .fields
                        .iter()
                        .filter(|(name, _)| fields.is_empty() || fields.contains(*name))
                        .filter_map(|(_, value)| value.as_str())
                        .flat_map(tokens)
                        .filter(|token| terms.contains(token))
                        .count();
                    (frequency > 0).then(|| hit(record, frequency as f64 * boost))
                })
                .collect()
        })
    }

    async fn graph_traverse(
        &self,
        source: &str,
        seeds: &[String],
        depth: u32,
        edge_types: &[String],
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError> {
        self.enter(source).await?;
        self.read(source, |store| {
            let context = BTreeMap::new();
            store
                .hops(seeds, depth, edge_types)
                .into_iter()
                .filter_map(|(id, hops)| {
                    let record = store.records.get(&id)?;
                    filter
                        .matches(&record.fields, &context)
                        .then(|| hit(record, f64::from(hops)))
                })
                .collect()
        })
    }

    async fn scalar_lookup(
        &self,
        source: &str,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<BackendHit>, BackendError> {
        self.enter(source).await?;
        self.read(source, |store| {
            store
                .matching(filter)
                .filter_map(|record| record.number(field).map(|value| hit(record, value)))
                .collect()
        })
    }

    async fn scan(&self, source: &str, filter: &Filter) -> Result<Vec<BackendHit>, BackendError> {
        self.enter(source).await?;
        self.read(source, |store| {
            store.matching(filter).map(|record| hit(record, 0.0)).collect()
        })
    }
}

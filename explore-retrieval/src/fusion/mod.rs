//! Score Fusion: weighted sum per (source, record id), then a total order.
//!
//! Ties on fused score break by
//! 1. earliest declaration ordinal with a nonzero weighted contribution,
//! 2. most recent timestamp (missing timestamps last),
//! 3. record id ascending,
//! 4. source alias ascending.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use explore_core::config::ComponentType;
use explore_core::models::{CandidateId, ComponentHit, ComponentScore, ScoredCandidate};

/// Completed output of one planned call.
#[derive(Debug, Clone)]
pub struct ComponentOutput {
    pub component: ComponentType,
    pub ordinal: usize,
    pub source: String,
    /// Normalized weight of the call.
    pub weight: f64,
    pub hits: Vec<ComponentHit>,
}

/// Merge component outputs into one ranked list of at most `limit` candidates.
pub fn fuse(outputs: &[ComponentOutput], limit: usize) -> Vec<ScoredCandidate> {
    let mut merged: BTreeMap<CandidateId, ScoredCandidate> = BTreeMap::new();

    for output in outputs {
        for hit in best_per_record(&output.hits) {
            let id = CandidateId::new(output.source.clone(), hit.record_id.clone());
            let candidate = merged.entry(id.clone()).or_insert_with(|| ScoredCandidate {
                id,
                scores: Vec::new(),
                fused_score: 0.0,
                timestamp: None,
                fields: serde_json::Map::new(),
            });
            candidate.scores.push(ComponentScore {
                component: output.component,
                ordinal: output.ordinal,
                raw: hit.raw_score,
                weight: output.weight,
            });
            candidate.timestamp = candidate.timestamp.max(hit.timestamp);
            for (name, value) in &hit.fields {
                candidate
                    .fields
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }
    }

    let mut ranked: Vec<ScoredCandidate> = merged
        .into_values()
        .map(|mut c| {
            c.fused_score = c.scores.iter().map(ComponentScore::weighted).sum();
            c
        })
        .collect();
    ranked.sort_by(compare);
    ranked.truncate(limit);

    tracing::debug!(candidates = ranked.len(), limit, "fusion complete");
    ranked
}

/// Best raw score per record within one call's output.
fn best_per_record(hits: &[ComponentHit]) -> Vec<&ComponentHit> {
    let mut best: BTreeMap<&str, &ComponentHit> = BTreeMap::new();
    for hit in hits {
        match best.get(hit.record_id.as_str()) {
            Some(existing) if existing.raw_score >= hit.raw_score => {}
            _ => {
                best.insert(hit.record_id.as_str(), hit);
            }
        }
    }
    best.into_values().collect()
}

/// Total order used for ranking.
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.fused_score
        .total_cmp(&a.fused_score)
        .then_with(|| {
            let first = |c: &ScoredCandidate| c.first_contributing_ordinal().unwrap_or(usize::MAX);
            first(a).cmp(&first(b))
        })
        .then_with(|| match (a.timestamp, b.timestamp) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.id.record_id.cmp(&b.id.record_id))
        .then_with(|| a.id.source.cmp(&b.id.source))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn output(
        component: ComponentType,
        ordinal: usize,
        source: &str,
        weight: f64,
        hits: &[(&str, f64)],
    ) -> ComponentOutput {
        ComponentOutput {
            component,
            ordinal,
            source: source.into(),
            weight,
            hits: hits.iter().map(|(id, s)| ComponentHit::new(*id, *s)).collect(),
        }
    }

    fn order(ranked: &[ScoredCandidate]) -> Vec<String> {
        ranked.iter().map(|c| c.id.record_id.clone()).collect()
    }

    #[test]
    fn weighted_sum_over_components() {
        // Vector 0.5 over knowledge, recency 0.5 over events.
        let ranked = fuse(
            &[
                output(
                    ComponentType::VectorSearch,
                    0,
                    "knowledge",
                    0.5,
                    &[("K1", 0.9), ("K2", 0.4)],
                ),
                output(ComponentType::Recency, 1, "events", 0.5, &[("E1", 0.8)]),
            ],
            10,
        );
        assert_eq!(order(&ranked), vec!["K1", "E1", "K2"]);
        let scores: Vec<f64> = ranked.iter().map(|c| c.fused_score).collect();
        for (got, want) in scores.iter().zip([0.45, 0.40, 0.20]) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn candidate_from_two_components_appears_once() {
        let ranked = fuse(
            &[
                output(ComponentType::VectorSearch, 0, "knowledge", 0.6, &[("K1", 0.5)]),
                output(ComponentType::KeywordSearch, 1, "knowledge", 0.4, &[("K1", 1.0)]),
            ],
            10,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].scores.len(), 2);
        assert!((ranked[0].fused_score - (0.6 * 0.5 + 0.4 * 1.0)).abs() < 1e-12);
    }

    #[test]
    fn same_record_id_in_two_sources_stays_distinct() {
        let ranked = fuse(
            &[
                output(ComponentType::Importance, 0, "a", 0.5, &[("r1", 0.5)]),
                output(ComponentType::Importance, 0, "b", 0.5, &[("r1", 0.5)]),
            ],
            10,
        );
        let sources: Vec<_> = ranked.iter().map(|c| c.id.source.as_str()).collect();
        assert_eq!(sources, vec!["a", "b"]);
    }

    #[test]
    fn duplicate_hit_within_one_call_keeps_best() {
        let ranked = fuse(
            &[output(ComponentType::VectorSearch, 0, "k", 1.0, &[("x", 0.3), ("x", 0.7)])],
            10,
        );
        assert_eq!(ranked[0].scores.len(), 1);
        assert!((ranked[0].fused_score - 0.7).abs() < 1e-12);
    }

    #[test]
    fn ties_break_by_ordinal_then_timestamp_then_id() {
        let now = Utc::now();
        let mut by_ordinal = fuse(
            &[
                output(ComponentType::Importance, 1, "s", 0.5, &[("late", 0.4)]),
                output(ComponentType::VectorSearch, 0, "s", 0.5, &[("early", 0.4)]),
            ],
            10,
        );
        assert_eq!(order(&by_ordinal), vec!["early", "late"]);

        let mut newer = ComponentHit::new("b", 0.4);
        newer.timestamp = Some(now);
        let mut older = ComponentHit::new("a", 0.4);
        older.timestamp = Some(now - Duration::hours(1));
        let untimed = ComponentHit::new("0", 0.4);
        let out = ComponentOutput {
            component: ComponentType::Recency,
            ordinal: 0,
            source: "s".into(),
            weight: 1.0,
            hits: vec![older, untimed, newer],
        };
        by_ordinal = fuse(&[out], 10);
        assert_eq!(order(&by_ordinal), vec!["b", "a", "0"]);

        let plain = fuse(
            &[output(ComponentType::Importance, 0, "s", 1.0, &[("z", 0.5), ("m", 0.5)])],
            10,
        );
        assert_eq!(order(&plain), vec!["m", "z"]);
    }

    #[test]
    fn limit_truncates_after_ranking() {
        let ranked = fuse(
            &[output(
                ComponentType::Importance,
                0,
                "s",
                1.0,
                &[("a", 0.1), ("b", 0.9), ("c", 0.5)],
            )],
            2,
        );
        assert_eq!(order(&ranked), vec!["b", "c"]);
    }
}

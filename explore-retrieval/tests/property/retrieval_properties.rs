use std::collections::{BTreeMap, BTreeSet};

use explore_core::config::{ComponentType, TokenBudgetConfig};
use explore_core::models::{CandidateId, ComponentHit, ScoredCandidate};
use explore_retrieval::planner::normalize_weights;
use explore_retrieval::{fuse, BudgetAllocator, ComponentOutput};
use explore_tokens::WordCounter;
use proptest::prelude::*;
use serde_json::{Map, Value};

const COMPONENTS: [ComponentType; 3] = [
    ComponentType::VectorSearch,
    ComponentType::KeywordSearch,
    ComponentType::Recency,
];

fn outputs_strategy() -> impl Strategy<Value = Vec<ComponentOutput>> {
    let hits = prop::collection::vec((0u8..12, 0.0f64..=1.0), 0..10);
    let output = (0usize..3, prop::sample::select(vec!["a", "b"]), 0.0f64..=1.0, hits);
    prop::collection::vec(output, 1..6).prop_map(|raw| {
        let weights = normalize_weights(&raw.iter().map(|(_, _, w, _)| *w).collect::<Vec<_>>());
        raw.into_iter()
            .zip(weights)
            .map(|((ordinal, source, _, hits), weight)| ComponentOutput {
                component: COMPONENTS[ordinal],
                ordinal,
                source: source.to_string(),
                weight,
                hits: hits
                    .into_iter()
                    .map(|(id, score)| ComponentHit::new(format!("r{id}"), score))
                    .collect(),
            })
            .collect()
    })
}

fn candidate(id: usize, words: usize) -> ScoredCandidate {
    let mut fields = Map::new();
    fields.insert("body".to_string(), Value::from(vec!["w"; words].join(" ")));
    ScoredCandidate {
        id: CandidateId::new("s", format!("r{id}")),
        scores: vec![],
        fused_score: 1.0 - id as f64 / 100.0,
        timestamp: None,
        fields,
    }
}

proptest! {
    #[test]
    fn normalized_weights_sum_to_one(weights in prop::collection::vec(0.0f64..=1.0, 1..12)) {
        let normalized = normalize_weights(&weights);
        let sum: f64 = normalized.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-9, "sum {}", sum);
        prop_assert!(normalized.iter().all(|w| *w >= 0.0));
    }

    #[test]
    fn fusion_never_duplicates_and_sums_weighted_scores(
        outputs in outputs_strategy(),
        limit in 1usize..30,
    ) {
        let fused = fuse(&outputs, limit);
        prop_assert!(fused.len() <= limit);

        let ids: BTreeSet<&CandidateId> = fused.iter().map(|c| &c.id).collect();
        prop_assert_eq!(ids.len(), fused.len());

        for candidate in &fused {
            let sum: f64 = candidate.scores.iter().map(|s| s.weighted()).sum();
            prop_assert!((candidate.fused_score - sum).abs() < 1e-9);
            prop_assert!(candidate.fused_score <= 1.0 + 1e-9);
        }
        for pair in fused.windows(2) {
            prop_assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }

    #[test]
    fn fusion_is_deterministic(outputs in outputs_strategy()) {
        let a: Vec<CandidateId> = fuse(&outputs, 50).into_iter().map(|c| c.id).collect();
        let b: Vec<CandidateId> = fuse(&outputs, 50).into_iter().map(|c| c.id).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn budget_is_never_exceeded(
        sizes in prop::collection::vec(0usize..12, 0..20),
        max_tokens in 0usize..60,
    ) {
        let ranked: Vec<ScoredCandidate> =
            sizes.iter().enumerate().map(|(i, &w)| candidate(i, w)).collect();
        let fields = BTreeMap::new();
        let budget = TokenBudgetConfig { enabled: true, max_tokens, priority: vec![] };
        let allocation = BudgetAllocator::new(&WordCounter, &fields)
            .allocate(ranked, Some(&budget), &BTreeMap::new());

        prop_assert!(allocation.tokens_used <= max_tokens);
        let total: usize = allocation.items.iter().map(|i| i.tokens).sum();
        prop_assert_eq!(total, allocation.tokens_used);
        prop_assert_eq!(allocation.items.len() + allocation.skipped, sizes.len());

        // Dropping the lowest-ranked included candidate never increases usage.
        if let Some(last) = allocation.items.last() {
            prop_assert!(total - last.tokens <= total);
        }
        // Included items keep fused order.
        for pair in allocation.items.windows(2) {
            prop_assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }
}

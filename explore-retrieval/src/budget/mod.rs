//! Token Budget Allocator: renders fields and keeps whole candidates under
//! a token ceiling, walking source priority tiers.

pub mod render;

use std::collections::{BTreeMap, BTreeSet};

use explore_core::config::{FieldSelection, TokenBudgetConfig};
use explore_core::models::{ResultItem, ScoredCandidate};
use explore_core::traits::TokenCounter;
use serde_json::Value;

pub use render::{render_text, select_fields};

/// Result of allocation: items in fused order plus accounting.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    pub items: Vec<ResultItem>,
    pub tokens_used: usize,
    /// Candidates dropped for not fitting the budget.
    pub skipped: usize,
}

/// Allocates ranked candidates into a token budget.
pub struct BudgetAllocator<'a> {
    counter: &'a dyn TokenCounter,
    fields: &'a BTreeMap<String, FieldSelection>,
}

impl<'a> BudgetAllocator<'a> {
    pub fn new(
        counter: &'a dyn TokenCounter,
        fields: &'a BTreeMap<String, FieldSelection>,
    ) -> Self {
        Self { counter, fields }
    }

    /// Render every candidate, then, when a budget is given, keep whole
    /// candidates tier by tier while the running total stays within
    /// `max_tokens`. Candidates that overflow are skipped, not fatal.
    pub fn allocate(
        &self,
        ranked: Vec<ScoredCandidate>,
        budget: Option<&TokenBudgetConfig>,
        context: &BTreeMap<String, Value>,
    ) -> Allocation {
        let rendered: Vec<ResultItem> = ranked
            .into_iter()
            .map(|candidate| self.render(candidate, context))
            .collect();

        let Some(budget) = budget else {
            let tokens_used = rendered.iter().map(|i| i.tokens).sum();
            return Allocation {
                items: rendered,
                tokens_used,
                skipped: 0,
            };
        };

        let accepted = select_within_budget(&rendered, budget);
        let tokens_used = accepted.iter().map(|&i| rendered[i].tokens).sum();
        let skipped = rendered.len() - accepted.len();
        let items = rendered
            .into_iter()
            .enumerate()
            .filter(|(i, _)| accepted.contains(i))
            .map(|(_, item)| item)
            .collect();
        Allocation {
            items,
            tokens_used,
            skipped,
        }
    }

    fn render(&self, candidate: ScoredCandidate, context: &BTreeMap<String, Value>) -> ResultItem {
        let fields = select_fields(
            &candidate.fields,
            self.fields.get(&candidate.id.source),
            context,
        );
        let tokens = self.counter.count(&render_text(&fields));
        ResultItem {
            source: candidate.id.source,
            record_id: candidate.id.record_id,
            fused_score: candidate.fused_score,
            breakdown: candidate.scores,
            fields,
            tokens,
        }
    }
}

/// Indices (into fused order) of the candidates that fit.
fn select_within_budget(items: &[ResultItem], budget: &TokenBudgetConfig) -> BTreeSet<usize> {
    let mut tiers: Vec<Vec<usize>> = budget
        .priority
        .iter()
        .map(|alias| {
            (0..items.len())
                .filter(|&i| &items[i].source == alias)
                .collect()
        })
        .collect();
    tiers.push(
        (0..items.len())
            .filter(|&i| !budget.priority.contains(&items[i].source))
            .collect(),
    );

    let mut accepted = BTreeSet::new();
    let mut running = 0usize;
    for index in tiers.into_iter().flatten() {
        if accepted.contains(&index) {
            continue;
        }
        let cost = items[index].tokens;
        if running + cost <= budget.max_tokens {
            running += cost;
            accepted.insert(index);
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use explore_core::models::CandidateId;
    use explore_tokens::WordCounter;
    use serde_json::json;

    use super::*;

    fn candidate(source: &str, id: &str, score: f64, words: usize) -> ScoredCandidate {
        let text = vec!["w"; words.saturating_sub(1)].join(" ");
        let fields = json!({ "text": text }).as_object().cloned().unwrap();
        ScoredCandidate {
            id: CandidateId::new(source, id),
            scores: vec![],
            fused_score: score,
            timestamp: None,
            fields,
        }
    }

    fn budget(max_tokens: usize, priority: &[&str]) -> TokenBudgetConfig {
        TokenBudgetConfig {
            enabled: true,
            max_tokens,
            priority: priority.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn priority_tiers_fill_before_lower_tiers() {
        // Rendered as "text: w w ...": one token for the key plus words - 1.
        let ranked = vec![
            candidate("skills", "S1", 0.9, 6),
            candidate("knowledge", "K1", 0.8, 5),
            candidate("skills", "S2", 0.7, 4),
        ];
        let fields = BTreeMap::new();
        let allocator = BudgetAllocator::new(&WordCounter, &fields);
        let tiers = budget(10, &["skills", "knowledge"]);
        let out = allocator.allocate(ranked, Some(&tiers), &BTreeMap::new());

        let ids: Vec<_> = out.items.iter().map(|i| i.record_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
        assert_eq!(out.tokens_used, 10);
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn overflow_skips_rather_than_stops() {
        let ranked = vec![
            candidate("a", "big", 0.9, 8),
            candidate("a", "huge", 0.8, 50),
            candidate("a", "small", 0.7, 2),
        ];
        let fields = BTreeMap::new();
        let allocator = BudgetAllocator::new(&WordCounter, &fields);
        let out = allocator.allocate(ranked, Some(&budget(10, &[])), &BTreeMap::new());
        let ids: Vec<_> = out.items.iter().map(|i| i.record_id.as_str()).collect();
        assert_eq!(ids, vec!["big", "small"]);
    }

    #[test]
    fn output_keeps_fused_order_across_tiers() {
        let ranked = vec![
            candidate("low", "L1", 0.9, 2),
            candidate("high", "H1", 0.5, 2),
        ];
        let fields = BTreeMap::new();
        let allocator = BudgetAllocator::new(&WordCounter, &fields);
        let out = allocator.allocate(ranked, Some(&budget(100, &["high"])), &BTreeMap::new());
        let ids: Vec<_> = out.items.iter().map(|i| i.record_id.as_str()).collect();
        assert_eq!(ids, vec!["L1", "H1"]);
    }

    #[test]
    fn no_budget_keeps_everything_and_counts_tokens() {
        let ranked = vec![candidate("a", "x", 0.9, 3), candidate("a", "y", 0.8, 4)];
        let fields = BTreeMap::new();
        let allocator = BudgetAllocator::new(&WordCounter, &fields);
        let out = allocator.allocate(ranked, None, &BTreeMap::new());
        assert_eq!(out.items.len(), 2);
        assert_eq!(out.tokens_used, 7);
    }
}

//! Query Planner: compiles a `RetrievalConfig` plus a `RuntimeQuery` into
//! an ordered list of planned component calls.

mod options;
mod weights;

use std::collections::BTreeSet;

use explore_core::config::{
    ComponentKind, ComponentType, RetrievalConfig, RetrievalStrategy, SourceConfig,
};
use explore_core::errors::{ExploreError, ExploreResult, NotFoundKind};
use explore_core::filter::Filter;
use explore_core::models::RuntimeQuery;
use explore_observability::tracing_setup::events;

pub use weights::normalize_weights;

/// Name under which the config's `default` strategy is addressed.
pub const DEFAULT_STRATEGY: &str = "default";

/// One component call against one source.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCall {
    /// Position in the plan.
    pub index: usize,
    /// Declaration index of the component within its strategy.
    pub ordinal: usize,
    pub source: String,
    /// Options with join and source defaults filled in.
    pub kind: ComponentKind,
    /// Source pre-filter AND join filter AND component filter AND runtime filters,
    /// with `context.` clauses already evaluated.
    pub filter: Filter,
    /// False when a `context.` clause failed; the call yields no candidates.
    pub context_ok: bool,
    /// Normalized weight.
    pub weight: f64,
    pub required: bool,
}

impl PlannedCall {
    pub fn component(&self) -> ComponentType {
        self.kind.component_type()
    }
}

/// Ephemeral, ordered execution plan for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub explore: String,
    pub version: u32,
    pub strategy: String,
    pub calls: Vec<PlannedCall>,
    /// Effective result limit.
    pub limit: usize,
}

impl ExecutionPlan {
    /// Source aliases touched by the plan.
    pub fn sources(&self) -> BTreeSet<String> {
        self.calls.iter().map(|c| c.source.clone()).collect()
    }

    pub fn needs_embedding(&self) -> bool {
        self.calls
            .iter()
            .any(|c| c.context_ok && c.component() == ComponentType::VectorSearch)
    }

    pub fn weight_sum(&self) -> f64 {
        self.calls.iter().map(|c| c.weight).sum()
    }
}

/// Build the execution plan for `query` against `config`.
pub fn plan(config: &RetrievalConfig, query: &RuntimeQuery) -> ExploreResult<ExecutionPlan> {
    let (strategy_name, strategy) = select_strategy(config, query.strategy.as_deref())?;

    if query.limit == Some(0) {
        return Err(ExploreError::invalid("limit must be at least 1"));
    }
    let limit = config.limits.effective(query.limit);
    let runtime_filter = query.filter();

    let mut calls = Vec::new();
    for (ordinal, component) in strategy.components.iter().enumerate() {
        let component_type = component.component_type();
        let weight = component.weight;
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(ExploreError::invalid(format!(
                "{component_type}#{ordinal}: weight {weight} outside [0, 1]"
            )));
        }
        options::validate(&component.kind, ordinal)?;

        let join = match &component.via {
            Some(reference) => Some(config.find_join(reference).ok_or_else(|| {
                ExploreError::invalid(format!(
                    "{component_type}#{ordinal}: unresolvable join {reference}"
                ))
            })?),
            None => None,
        };

        let sources = if component.source.is_empty() {
            config
                .sources
                .iter()
                .filter(|s| s.supports(component_type.capability()))
                .collect::<Vec<_>>()
        } else {
            component
                .source
                .iter()
                .map(|alias| -> ExploreResult<&SourceConfig> {
                    let source = config.source(alias).ok_or_else(|| {
                        ExploreError::invalid(format!(
                            "{component_type}#{ordinal}: undeclared source {alias}"
                        ))
                    })?;
                    if !source.supports(component_type.capability()) {
                        return Err(ExploreError::invalid(format!(
                            "{component_type}#{ordinal}: source {alias} lacks {:?} capability",
                            component_type.capability()
                        )));
                    }
                    Ok(source)
                })
                .collect::<ExploreResult<Vec<_>>>()?
        };

        for source in sources {
            let mut filter = source.filter.clone();
            if let Some(join) = join {
                filter = filter.and(&join.filter);
            }
            let filter = filter.and(&component.filter).and(&runtime_filter);
            let (filter, context_ok) = filter.resolve_context(&query.context);

            calls.push(PlannedCall {
                index: calls.len(),
                ordinal,
                source: source.alias.clone(),
                kind: options::resolve(&component.kind, source, join)?,
                filter,
                context_ok,
                weight,
                required: source.required,
            });
        }
    }

    let normalized = normalize_weights(&calls.iter().map(|c| c.weight).collect::<Vec<_>>());
    for (call, weight) in calls.iter_mut().zip(normalized) {
        call.weight = weight;
    }

    events::query_planned(&config.name, &strategy_name, calls.len(), limit);
    Ok(ExecutionPlan {
        explore: config.name.clone(),
        version: config.version,
        strategy: strategy_name,
        calls,
        limit,
    })
}

fn select_strategy<'a>(
    config: &'a RetrievalConfig,
    requested: Option<&str>,
) -> ExploreResult<(String, &'a RetrievalStrategy)> {
    match requested {
        None => Ok((DEFAULT_STRATEGY.to_string(), &config.default)),
        Some(name) => match config.strategy_named(name) {
            Some(strategy) => Ok((name.to_string(), strategy)),
            None if name == DEFAULT_STRATEGY => Ok((name.to_string(), &config.default)),
            None => Err(ExploreError::not_found(NotFoundKind::Strategy, name)),
        },
    }
}

#[cfg(test)]
mod tests {
    use explore_core::config::{
        Capability, JoinConfig, JoinKind, RetrievalComponent, RetrievalMethod, SourceConfig,
    };
    use explore_core::filter::Predicate;

    use super::*;

    fn config(components: Vec<RetrievalComponent>) -> RetrievalConfig {
        RetrievalConfig {
            name: "agent_context".into(),
            version: 1,
            description: None,
            sources: vec![
                SourceConfig::new("knowledge", "semantic")
                    .with_capabilities(vec![Capability::Vector, Capability::Keyword])
                    .with_filter(Filter::all().with(Predicate::equals("status", "active"))),
                SourceConfig::new("events", "episodic")
                    .with_capabilities(vec![Capability::Scalar])
                    .required(true),
                SourceConfig::new("graph", "relational")
                    .with_capabilities(vec![Capability::Graph]),
            ],
            joins: vec![JoinConfig {
                name: Some("related".into()),
                from: "knowledge".into(),
                to: "graph".into(),
                kind: JoinKind::GraphPath,
                depth: Some(3),
                edge_types: vec!["relates_to".into()],
                filter: Filter::all().with(Predicate::equals("visible", true)),
            }],
            fields: Default::default(),
            default: RetrievalStrategy::new(RetrievalMethod::Hybrid, components),
            strategies: Default::default(),
            limits: Default::default(),
            cache: Default::default(),
        }
    }

    fn vector(weight: f64) -> RetrievalComponent {
        RetrievalComponent::new(
            ComponentKind::VectorSearch {
                k: 5,
                threshold: 0.0,
                metric: Default::default(),
            },
            weight,
        )
    }

    fn recency(weight: f64) -> RetrievalComponent {
        RetrievalComponent::new(
            ComponentKind::Recency {
                decay_rate: 0.01,
                field: None,
            },
            weight,
        )
    }

    #[test]
    fn weights_are_rescaled_across_calls() {
        let cfg = config(vec![vector(0.2), recency(0.6)]);
        let plan = plan(&cfg, &RuntimeQuery::new("agent_context")).unwrap();
        assert_eq!(plan.calls.len(), 2);
        assert!((plan.weight_sum() - 1.0).abs() < 1e-9);
        assert!((plan.calls[0].weight - 0.25).abs() < 1e-9);
        assert!((plan.calls[1].weight - 0.75).abs() < 1e-9);
    }

    #[test]
    fn capability_resolution_selects_capable_sources() {
        let cfg = config(vec![vector(1.0), recency(1.0)]);
        let plan = plan(&cfg, &RuntimeQuery::new("agent_context")).unwrap();
        let sources: Vec<_> = plan.calls.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["knowledge", "events"]);
        assert!(plan.calls[1].required);
        assert!(plan.needs_embedding());
    }

    #[test]
    fn effective_filter_is_ordered_conjunction() {
        let cfg = config(vec![vector(1.0)
            .on_source("knowledge")
            .with_filter(Filter::all().with(Predicate::equals("lang", "rust")))]);
        let q = RuntimeQuery::new("agent_context").with_filter("tenant", "acme");
        let plan = plan(&cfg, &q).unwrap();
        let fields: Vec<_> = plan.calls[0]
            .filter
            .clauses()
            .iter()
            .map(|p| p.field.as_str())
            .collect();
        assert_eq!(fields, vec!["status", "lang", "tenant"]);
    }

    #[test]
    fn graph_join_supplies_depth_and_edge_types() {
        let graph = RetrievalComponent::new(
            ComponentKind::GraphTraversal {
                depth: None,
                edge_types: vec![],
            },
            1.0,
        )
        .via("related");
        let plan = plan(&config(vec![graph]), &RuntimeQuery::new("agent_context")).unwrap();
        assert_eq!(plan.calls[0].source, "graph");
        assert_eq!(
            plan.calls[0].kind,
            ComponentKind::GraphTraversal {
                depth: Some(3),
                edge_types: vec!["relates_to".into()],
            }
        );
        assert_eq!(plan.calls[0].filter.clauses()[0].field, "visible");
    }

    #[test]
    fn unknown_strategy_is_not_found() {
        let cfg = config(vec![vector(1.0)]);
        let query = RuntimeQuery::new("agent_context").with_strategy("nope");
        let err = plan(&cfg, &query).unwrap_err();
        assert!(matches!(
            err,
            ExploreError::NotFound {
                kind: NotFoundKind::Strategy,
                ..
            }
        ));
        let ok = plan(&cfg, &RuntimeQuery::new("agent_context").with_strategy("default")).unwrap();
        assert_eq!(ok.strategy, "default");
    }

    #[test]
    fn planning_rejects_bad_arguments() {
        let bad_weight = config(vec![vector(1.5)]);
        assert!(matches!(
            plan(&bad_weight, &RuntimeQuery::new("agent_context")),
            Err(ExploreError::InvalidArgument { .. })
        ));

        let zero_decay = config(vec![RetrievalComponent::new(
            ComponentKind::Recency {
                decay_rate: 0.0,
                field: None,
            },
            1.0,
        )]);
        assert!(matches!(
            plan(&zero_decay, &RuntimeQuery::new("agent_context")),
            Err(ExploreError::InvalidArgument { .. })
        ));

        let bad_join = config(vec![vector(1.0).via("nowhere")]);
        assert!(matches!(
            plan(&bad_join, &RuntimeQuery::new("agent_context")),
            Err(ExploreError::InvalidArgument { .. })
        ));

        let undeclared = config(vec![vector(1.0).on_source("ghost")]);
        assert!(matches!(
            plan(&undeclared, &RuntimeQuery::new("agent_context")),
            Err(ExploreError::InvalidArgument { .. })
        ));

        let ok = config(vec![vector(1.0)]);
        assert!(matches!(
            plan(&ok, &RuntimeQuery::new("agent_context").with_limit(0)),
            Err(ExploreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn limit_is_clamped_to_max() {
        let mut cfg = config(vec![vector(1.0)]);
        cfg.limits.max = 25;
        let plan = plan(&cfg, &RuntimeQuery::new("agent_context").with_limit(1_000)).unwrap();
        assert_eq!(plan.limit, 25);
    }

    #[test]
    fn failing_context_clause_marks_call_inert() {
        let cfg = config(vec![vector(1.0)
            .with_filter(Filter::all().with(Predicate::equals("context.mode", "deep")))]);
        let fast = RuntimeQuery::new("agent_context").with_context("mode", "fast");
        let shallow = plan(&cfg, &fast).unwrap();
        assert!(!shallow.calls[0].context_ok);
        assert!(!shallow.needs_embedding());
        let deep_query = RuntimeQuery::new("agent_context").with_context("mode", "deep");
        let deep = plan(&cfg, &deep_query).unwrap();
        assert!(deep.calls[0].context_ok);
    }
}

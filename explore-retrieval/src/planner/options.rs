use explore_core::config::{defaults, ComponentKind, JoinConfig, SourceConfig};
use explore_core::constants::MAX_GRAPH_DEPTH;
use explore_core::errors::{ExploreError, ExploreResult};

/// Plan-time checks on type-specific options.
pub(super) fn validate(kind: &ComponentKind, ordinal: usize) -> ExploreResult<()> {
    let component = kind.component_type();
    let reject = |reason: String| -> ExploreResult<()> {
        Err(ExploreError::invalid(format!("{component}#{ordinal}: {reason}")))
    };
    match kind {
        ComponentKind::VectorSearch { k, threshold, .. } => {
            if *k == 0 {
                return reject("k must be at least 1".into());
            }
            if !(0.0..=1.0).contains(threshold) {
                return reject(format!("threshold {threshold} outside [0, 1]"));
            }
        }
        ComponentKind::KeywordSearch { boost, .. } => {
            if !boost.is_finite() || *boost <= 0.0 {
                return reject(format!("boost {boost} must be positive"));
            }
        }
        ComponentKind::GraphTraversal { depth: Some(depth), .. } => {
            if *depth == 0 || *depth > MAX_GRAPH_DEPTH {
                return reject(format!("depth {depth} outside 1..={MAX_GRAPH_DEPTH}"));
            }
        }
        ComponentKind::Recency { decay_rate, .. } => {
            if !decay_rate.is_finite() || *decay_rate <= 0.0 {
                return reject(format!("decay_rate {decay_rate} must be positive"));
            }
        }
        ComponentKind::Importance { field } if field.trim().is_empty() => {
            return reject("importance field must not be empty".into());
        }
        _ => {}
    }
    Ok(())
}

/// Fill options the component leaves unset from the join and the source.
pub(super) fn resolve(
    kind: &ComponentKind,
    source: &SourceConfig,
    join: Option<&JoinConfig>,
) -> ExploreResult<ComponentKind> {
    Ok(match kind {
        ComponentKind::GraphTraversal { depth, edge_types } => {
            let depth = depth
                .or_else(|| join.and_then(|j| j.depth))
                .unwrap_or(defaults::DEFAULT_GRAPH_DEPTH);
            if depth == 0 || depth > MAX_GRAPH_DEPTH {
                return Err(ExploreError::invalid(format!(
                    "graph_traversal: join depth {depth} outside 1..={MAX_GRAPH_DEPTH}"
                )));
            }
            let edge_types = match (edge_types.is_empty(), join) {
                (true, Some(join)) => join.edge_types.clone(),
                _ => edge_types.clone(),
            };
            ComponentKind::GraphTraversal {
                depth: Some(depth),
                edge_types,
            }
        }
        ComponentKind::Recency { decay_rate, field } => ComponentKind::Recency {
            decay_rate: *decay_rate,
            field: Some(
                field
                    .clone()
                    .unwrap_or_else(|| source.timestamp_field().to_string()),
            ),
        },
        other => other.clone(),
    })
}

use explore_core::config::defaults::DEFAULT_GRAPH_DEPTH;
use explore_core::errors::ComponentError;
use explore_core::models::ComponentHit;
use explore_core::traits::BackendConnector;

use super::{to_hit, QueryInputs};
use crate::planner::PlannedCall;

/// BFS from the query seeds; raw score = 1 / (1 + hops).
pub(super) async fn run(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    inputs: &QueryInputs,
    depth: Option<u32>,
    edge_types: &[String],
) -> Result<Vec<ComponentHit>, ComponentError> {
    if inputs.seeds.is_empty() {
        return Ok(Vec::new());
    }
    let hits = connector
        .graph_traverse(
            &call.source,
            &inputs.seeds,
            depth.unwrap_or(DEFAULT_GRAPH_DEPTH),
            edge_types,
            &call.filter,
        )
        .await?;

    Ok(hits
        .into_iter()
        .filter(|h| h.score.is_finite() && h.score >= 0.0)
        .map(|h| {
            let raw = 1.0 / (1.0 + h.score);
            to_hit(h, raw)
        })
        .collect())
}

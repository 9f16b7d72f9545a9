use explore_core::errors::ComponentError;
use explore_core::filter::{Filter, Predicate};
use explore_core::models::ComponentHit;
use explore_core::traits::BackendConnector;

use super::{to_hit, QueryInputs};
use crate::planner::PlannedCall;

/// Fraction of trigger conditions that hold for the record and the runtime
/// context. Records matching none are dropped; no conditions yields nothing.
pub(super) async fn run(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    inputs: &QueryInputs,
    conditions: &[Predicate],
) -> Result<Vec<ComponentHit>, ComponentError> {
    if conditions.is_empty() {
        return Ok(Vec::new());
    }
    let triggers = Filter::from_clauses(conditions.to_vec());
    let total = triggers.len() as f64;

    let hits = connector.scan(&call.source, &call.filter).await?;
    Ok(hits
        .into_iter()
        .filter_map(|h| {
            let matched = triggers.count_matching(&h.fields, &inputs.context);
            (matched > 0).then(|| {
                let raw = matched as f64 / total;
                to_hit(h, raw)
            })
        })
        .collect())
}

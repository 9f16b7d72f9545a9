use explore_core::errors::ComponentError;
use explore_core::models::ComponentHit;
use explore_core::traits::BackendConnector;

use super::to_hit;
use crate::planner::PlannedCall;

/// Stored importance, clamped to [0, 1].
pub(super) async fn run(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    field: &str,
) -> Result<Vec<ComponentHit>, ComponentError> {
    let hits = connector
        .scalar_lookup(&call.source, field, &call.filter)
        .await?;
    Ok(hits
        .into_iter()
        .filter(|h| h.score.is_finite())
        .map(|h| {
            let raw = h.score;
            to_hit(h, raw)
        })
        .collect())
}

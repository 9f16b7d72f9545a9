use explore_core::errors::ComponentError;
use explore_core::models::ComponentHit;
use explore_core::traits::BackendConnector;

use super::{to_hit, QueryInputs};
use crate::planner::PlannedCall;

/// Lexical relevance normalized by the best score in the result set.
/// No query text yields no candidates.
pub(super) async fn run(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    inputs: &QueryInputs,
    fields: &[String],
    boost: f64,
) -> Result<Vec<ComponentHit>, ComponentError> {
    let Some(text) = inputs.text.as_deref() else {
        return Ok(Vec::new());
    };
    let hits = connector
        .keyword_search(&call.source, fields, text, boost, &call.filter)
        .await?;

    let max = hits
        .iter()
        .map(|h| h.score)
        .filter(|s| s.is_finite())
        .fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return Ok(Vec::new());
    }
    Ok(hits
        .into_iter()
        .filter(|h| h.score > 0.0)
        .map(|h| {
            let raw = h.score / max;
            to_hit(h, raw)
        })
        .collect())
}

use explore_core::config::DistanceMetric;
use explore_core::errors::ComponentError;
use explore_core::models::ComponentHit;
use explore_core::traits::BackendConnector;

use super::{to_hit, QueryInputs};
use crate::planner::PlannedCall;

pub(super) async fn run(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    inputs: &QueryInputs,
    k: usize,
    threshold: f64,
    metric: DistanceMetric,
) -> Result<Vec<ComponentHit>, ComponentError> {
    if let Some(err) = &inputs.embedding_error {
        return Err(err.clone());
    }
    let embedding = inputs.embedding.as_deref().ok_or_else(|| ComponentError::InvalidArgument {
        reason: "vector_search needs a query embedding or a configured embedder".into(),
    })?;

    let hits = connector
        .vector_search(
            &call.source,
            embedding,
            k,
            metric.native_threshold(threshold),
            metric,
            &call.filter,
        )
        .await?;

    let mut scored: Vec<ComponentHit> = hits
        .into_iter()
        .map(|hit| {
            let similarity = metric.to_similarity(hit.score);
            to_hit(hit, similarity)
        })
        .filter(|hit| hit.raw_score >= threshold)
        .collect();
    scored.sort_by(|a, b| {
        b.raw_score
            .total_cmp(&a.raw_score)
            .then_with(|| a.record_id.cmp(&b.record_id))
    });
    scored.truncate(k);
    Ok(scored)
}

use chrono::{DateTime, Utc};
use explore_core::config::defaults::DEFAULT_TIMESTAMP_FIELD;
use explore_core::errors::ComponentError;
use explore_core::models::ComponentHit;
use explore_core::traits::BackendConnector;

use super::{to_hit, QueryInputs};
use crate::planner::PlannedCall;

/// Exponential decay on record age: `exp(-age_seconds * decay_rate)`.
/// Future timestamps count as age 0.
pub(super) async fn run(
    connector: &dyn BackendConnector,
    call: &PlannedCall,
    inputs: &QueryInputs,
    decay_rate: f64,
    field: Option<&str>,
) -> Result<Vec<ComponentHit>, ComponentError> {
    if !decay_rate.is_finite() || decay_rate <= 0.0 {
        return Err(ComponentError::InvalidArgument {
            reason: format!("recency decay_rate {decay_rate} must be positive"),
        });
    }
    let field = field.unwrap_or(DEFAULT_TIMESTAMP_FIELD);
    let hits = connector
        .scalar_lookup(&call.source, field, &call.filter)
        .await?;

    let now = inputs.now.timestamp_millis() as f64 / 1000.0;
    Ok(hits
        .into_iter()
        .map(|mut h| {
            let seconds = h.score;
            if h.timestamp.is_none() {
                h.timestamp = from_unix_seconds(seconds);
            }
            let age = (now - seconds).max(0.0);
            to_hit(h, decay(age, decay_rate))
        })
        .collect())
}

pub(crate) fn decay(age_seconds: f64, decay_rate: f64) -> f64 {
    (-age_seconds.max(0.0) * decay_rate).exp()
}

fn from_unix_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0) as i64)
}

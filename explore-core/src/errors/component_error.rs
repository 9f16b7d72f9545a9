use std::fmt;

use serde::{Deserialize, Serialize};

use super::BackendError;
use crate::config::ComponentType;

/// Typed failure of a single component executor call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentError {
    #[error("backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    #[error("timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl ComponentError {
    /// Transient failures may be absorbed when the owning source is optional.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. } | Self::Timeout { .. })
    }
}

impl From<BackendError> for ComponentError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable { reason } => Self::BackendUnavailable { reason },
            BackendError::Timeout { elapsed_ms } => Self::Timeout { elapsed_ms },
            BackendError::InvalidRequest { reason } => Self::InvalidArgument { reason },
            BackendError::UnknownSource { source_alias } => Self::BackendUnavailable {
                reason: format!("backend does not serve source {source_alias}"),
            },
        }
    }
}

/// A component error together with the planned call that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub component: ComponentType,
    /// Declaration index of the component within its strategy.
    pub ordinal: usize,
    pub source_alias: String,
    pub error: ComponentError,
}

impl fmt::Display for ComponentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{} on {}: {}",
            self.component, self.ordinal, self.source_alias, self.error
        )
    }
}

/// Failures reported by a Backend Connector implementation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("backend timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("invalid backend request: {reason}")]
    InvalidRequest { reason: String },

    #[error("unknown source: {source_alias}")]
    UnknownSource { source_alias: String },
}

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ComponentError, ComponentFailure, ConfigError};

/// What a `NotFound` error failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundKind {
    Explore,
    Strategy,
    Source,
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Explore => "explore",
            Self::Strategy => "strategy",
            Self::Source => "source",
        };
        f.write_str(s)
    }
}

/// Top-level error surfaced to callers of the explore engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExploreError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: NotFoundKind, name: String },

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("backend unavailable for source {source_alias}: {reason}")]
    BackendUnavailable { source_alias: String, reason: String },

    #[error("source {source_alias} timed out after {elapsed_ms}ms")]
    Timeout { source_alias: String, elapsed_ms: u64 },

    #[error("query cancelled")]
    Cancelled,

    #[error("{} required component call(s) failed: {}", .failures.len(), summarize(.failures))]
    AggregateFailure { failures: Vec<ComponentFailure> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("tokenizer error: {reason}")]
    Tokenizer { reason: String },
}

impl ExploreError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: NotFoundKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Stable snake_case name of the variant, for logs and the query log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Cancelled => "cancelled",
            Self::AggregateFailure { .. } => "aggregate_failure",
            Self::Config(_) => "config",
            Self::Tokenizer { .. } => "tokenizer",
        }
    }

    /// Failures listed by an `AggregateFailure`, empty for every other kind.
    pub fn failures(&self) -> &[ComponentFailure] {
        match self {
            Self::AggregateFailure { failures } => failures,
            _ => &[],
        }
    }
}

impl From<ComponentFailure> for ExploreError {
    fn from(failure: ComponentFailure) -> Self {
        match failure.error {
            ComponentError::BackendUnavailable { reason } => Self::BackendUnavailable {
                source_alias: failure.source_alias,
                reason,
            },
            ComponentError::Timeout { elapsed_ms } => Self::Timeout {
                source_alias: failure.source_alias,
                elapsed_ms,
            },
            ComponentError::InvalidArgument { reason } => Self::InvalidArgument { reason },
        }
    }
}

fn summarize(failures: &[ComponentFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

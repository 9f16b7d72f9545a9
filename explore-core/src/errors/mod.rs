mod backend_error;
mod component_error;
mod config_error;
mod explore_error;

pub use backend_error::BackendError;
pub use component_error::{ComponentError, ComponentFailure};
pub use config_error::ConfigError;
pub use explore_error::{ExploreError, NotFoundKind};

/// Result alias used across every explore crate.
pub type ExploreResult<T> = Result<T, ExploreError>;

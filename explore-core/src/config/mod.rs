pub mod defaults;
mod engine_config;
mod observability_config;
mod retrieval_config;
mod strategy;

use serde::{Deserialize, Serialize};

pub use engine_config::{EngineConfig, TokenCounterKind};
pub use observability_config::ObservabilityConfig;
pub use retrieval_config::{
    CacheSettings, ConditionalField, FieldSelection, InvalidationMode, InvalidationScope,
    JoinConfig, JoinKind, Limits, RetrievalConfig, SourceConfig, TokenBudgetConfig,
};
pub use strategy::{
    Capability, ComponentKind, ComponentType, DistanceMetric, RetrievalComponent,
    RetrievalMethod, RetrievalStrategy,
};

use crate::errors::ConfigError;

/// Top-level settings file for a process hosting the explore engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreSettings {
    pub engine: EngineConfig,
    pub observability: ObservabilityConfig,
}

impl ExploreSettings {
    /// Parse settings from TOML. Missing sections fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

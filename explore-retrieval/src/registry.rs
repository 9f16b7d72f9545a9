//! Process-wide store of compiled explores keyed by name.
//!
//! Configs are validated once and shared behind `Arc`; a reload swaps the
//! `Arc` and never mutates a config in place.

use std::sync::Arc;

use dashmap::DashMap;
use explore_core::config::RetrievalConfig;
use explore_core::errors::{ExploreError, ExploreResult, NotFoundKind};

#[derive(Debug, Default)]
pub struct ConfigRegistry {
    configs: DashMap<String, Arc<RetrievalConfig>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an explore. A replacement must carry a strictly
    /// higher version. Returns the config it replaced, if any.
    pub fn register(&self, config: RetrievalConfig) -> ExploreResult<Option<Arc<RetrievalConfig>>> {
        config.validate()?;
        let name = config.name.clone();
        let config = Arc::new(config);

        let mut slot = self.configs.entry(name).or_insert_with(|| Arc::clone(&config));
        if Arc::ptr_eq(slot.value(), &config) {
            tracing::info!(explore = %config.id(), "explore registered");
            return Ok(None);
        }
        let current = slot.value();
        if config.version <= current.version {
            return Err(ExploreError::invalid(format!(
                "{}: reload needs a version above {} (got {})",
                config.name, current.version, config.version
            )));
        }
        tracing::info!(from = %current.id(), to = %config.id(), "explore reloaded");
        Ok(Some(std::mem::replace(slot.value_mut(), config)))
    }

    pub fn get(&self, name: &str) -> ExploreResult<Arc<RetrievalConfig>> {
        self.configs
            .get(name)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| ExploreError::not_found(NotFoundKind::Explore, name))
    }

    /// Remove an explore. Returns whether it was registered.
    pub fn remove(&self, name: &str) -> bool {
        self.configs.remove(name).is_some()
    }

    /// Registered explore names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configs.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use explore_core::config::{RetrievalStrategy, SourceConfig};

    use super::*;

    fn config(version: u32) -> RetrievalConfig {
        RetrievalConfig {
            name: "notes".into(),
            version,
            description: None,
            sources: vec![SourceConfig::new("notes", "semantic")],
            joins: vec![],
            fields: Default::default(),
            default: RetrievalStrategy::default(),
            strategies: Default::default(),
            limits: Default::default(),
            cache: Default::default(),
        }
    }

    #[test]
    fn reload_needs_a_higher_version() {
        let registry = ConfigRegistry::new();
        assert!(registry.register(config(1)).unwrap().is_none());
        assert!(registry.register(config(1)).is_err());

        let replaced = registry.register(config(3)).unwrap().unwrap();
        assert_eq!(replaced.version, 1);
        assert_eq!(registry.get("notes").unwrap().version, 3);
        assert!(registry.register(config(2)).is_err());
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = ConfigRegistry::new();
        assert!(matches!(
            registry.get("missing"),
            Err(ExploreError::NotFound { kind: NotFoundKind::Explore, .. })
        ));
        registry.register(config(1)).unwrap();
        assert_eq!(registry.names(), vec!["notes".to_string()]);
        assert!(registry.remove("notes"));
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut bad = config(1);
        bad.sources.clear();
        assert!(matches!(
            ConfigRegistry::new().register(bad),
            Err(ExploreError::Config(_))
        ));
    }
}

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::defaults;
use super::strategy::{Capability, ComponentKind, RetrievalStrategy};
use crate::errors::ConfigError;
use crate::filter::Filter;

/// A named, versioned retrieval configuration (an "explore").
///
/// Parsed once, validated, then shared read-only behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub name: String,
    #[serde(default = "defaults::version")]
    pub version: u32,
    #[serde(default)]
    pub description: Option<String>,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub joins: Vec<JoinConfig>,
    /// Per-source field selection, keyed by source alias.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSelection>,
    pub default: RetrievalStrategy,
    #[serde(default)]
    pub strategies: BTreeMap<String, RetrievalStrategy>,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// A source alias bound to a memory type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub alias: String,
    pub memory_type: String,
    /// Pre-filter applied to every component call against this source.
    #[serde(default)]
    pub filter: Filter,
    /// A failing required source fails the whole query.
    #[serde(default)]
    pub required: bool,
    /// Capabilities the backend offers for this source; empty means all.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub timestamp_field: Option<String>,
}

impl SourceConfig {
    pub fn new(alias: impl Into<String>, memory_type: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            memory_type: memory_type.into(),
            filter: Filter::all(),
            required: false,
            capabilities: Vec::new(),
            timestamp_field: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_capabilities(mut self, capabilities: Vec<Capability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.is_empty() || self.capabilities.contains(&capability)
    }

    pub fn timestamp_field(&self) -> &str {
        self.timestamp_field
            .as_deref()
            .unwrap_or(defaults::DEFAULT_TIMESTAMP_FIELD)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    GraphPath,
}

/// A relationship between two source aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub kind: JoinKind,
    /// Path depth for `graph_path` joins.
    #[serde(default)]
    pub depth: Option<u32>,
    #[serde(default)]
    pub edge_types: Vec<String>,
    /// Filter contributed to any component routed `via` this join.
    #[serde(default)]
    pub filter: Filter,
}

impl JoinConfig {
    /// Whether `reference` names this join, by name or as `from.to`.
    pub fn is_referenced_by(&self, reference: &str) -> bool {
        if self.name.as_deref() == Some(reference) {
            return true;
        }
        reference
            .split_once('.')
            .is_some_and(|(from, to)| from == self.from && to == self.to)
    }
}

/// Field include/exclude/rename rules for one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelection {
    /// Fields to keep; empty keeps every field.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Output name per original field name.
    pub rename: BTreeMap<String, String>,
    pub conditional: Vec<ConditionalField>,
}

/// A field emitted only when `when` holds for the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalField {
    pub field: String,
    pub when: Filter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub default: usize,
    pub max: usize,
    pub token_budget: Option<TokenBudgetConfig>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            default: defaults::DEFAULT_RESULT_LIMIT,
            max: defaults::DEFAULT_MAX_RESULT_LIMIT,
            token_budget: None,
        }
    }
}

impl Limits {
    /// Caller limit (or the default), silently clamped to `max`.
    pub fn effective(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).min(self.max)
    }

    /// The token budget, if configured and enabled.
    pub fn active_token_budget(&self) -> Option<&TokenBudgetConfig> {
        self.token_budget.as_ref().filter(|b| b.enabled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBudgetConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
    pub max_tokens: usize,
    /// Source aliases, highest priority first.
    #[serde(default)]
    pub priority: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationMode {
    /// Invalidate synchronously when a record changes.
    #[default]
    WriteThrough,
    /// Queue invalidations and apply them asynchronously.
    WriteBehind,
    /// Only TTL expiry or explicit operator action.
    Manual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationScope {
    /// Any entry whose plan touched the changed record's source.
    #[default]
    Source,
    /// Only entries whose result contains the changed record.
    Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub invalidation: InvalidationMode,
    pub scope: InvalidationScope,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_CACHE_ENABLED,
            ttl_secs: defaults::DEFAULT_CACHE_TTL_SECS,
            invalidation: InvalidationMode::default(),
            scope: InvalidationScope::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// `name@vN`, the identity used in cache keys and logs.
    pub fn id(&self) -> String {
        format!("{}@v{}", self.name, self.version)
    }

    pub fn source(&self, alias: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.alias == alias)
    }

    pub fn strategy_named(&self, name: &str) -> Option<&RetrievalStrategy> {
        self.strategies.get(name)
    }

    pub fn find_join(&self, reference: &str) -> Option<&JoinConfig> {
        self.joins.iter().find(|j| j.is_referenced_by(reference))
    }

    /// Structural checks the engine relies on. Does not replace schema validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::invalid("explore name must not be empty"));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::invalid(format!("{}: no sources declared", self.name)));
        }

        let mut aliases = HashSet::new();
        for source in &self.sources {
            if !aliases.insert(source.alias.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "{}: duplicate source alias {}",
                    self.name, source.alias
                )));
            }
            source.filter.validate()?;
        }
        let declared = |alias: &str, what: &str| -> Result<(), ConfigError> {
            if aliases.contains(alias) {
                Ok(())
            } else {
                Err(ConfigError::invalid(format!(
                    "{}: {what} references undeclared source {alias}",
                    self.name
                )))
            }
        };

        for join in &self.joins {
            declared(&join.from, "join")?;
            declared(&join.to, "join")?;
            join.filter.validate()?;
        }
        for (alias, selection) in &self.fields {
            declared(alias, "fields")?;
            for conditional in &selection.conditional {
                conditional.when.validate()?;
            }
        }

        if self.limits.default == 0 {
            return Err(ConfigError::invalid("limits.default must be at least 1"));
        }
        if self.limits.default > self.limits.max {
            return Err(ConfigError::invalid(format!(
                "limits.default ({}) exceeds limits.max ({})",
                self.limits.default, self.limits.max
            )));
        }
        if let Some(budget) = &self.limits.token_budget {
            for alias in &budget.priority {
                declared(alias, "token_budget.priority")?;
            }
        }

        let strategies = std::iter::once(("default", &self.default))
            .chain(self.strategies.iter().map(|(n, s)| (n.as_str(), s)));
        for (name, strategy) in strategies {
            for component in &strategy.components {
                let w = component.weight;
                if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                    return Err(ConfigError::invalid(format!(
                        "strategy {name}: {} weight {w} outside [0, 1]",
                        component.component_type()
                    )));
                }
                for alias in &component.source {
                    declared(alias, "component")?;
                }
                if let Some(via) = &component.via {
                    if self.find_join(via).is_none() {
                        return Err(ConfigError::invalid(format!(
                            "strategy {name}: unresolvable join {via}"
                        )));
                    }
                }
                component.filter.validate()?;
                if let ComponentKind::ProceduralMatch { conditions } = &component.kind {
                    Filter::from_clauses(conditions.clone()).validate()?;
                }
            }
        }
        Ok(())
    }
}

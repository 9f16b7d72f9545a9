//! Conjunctive filter language shared by source pre-filters, join filters,
//! component filters, conditional fields, and procedural trigger conditions.
//!
//! A [`Filter`] is an ordered list of [`Predicate`]s, all of which must hold.
//! Combining two filters concatenates their clauses, which is logical AND.

mod eval;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ConfigError;

/// Field prefix that redirects a predicate to the runtime query context.
pub const CONTEXT_PREFIX: &str = "context.";

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    #[default]
    Eq,
    Ne,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    Exists,
    Matches,
}

/// A single `{field, op, value}` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    #[serde(default)]
    pub op: FilterOp,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Evaluate against a record's fields and the runtime context.
    pub fn evaluate(
        &self,
        record: &serde_json::Map<String, Value>,
        context: &BTreeMap<String, Value>,
    ) -> bool {
        let actual = match self.field.strip_prefix(CONTEXT_PREFIX) {
            Some(key) => context.get(key),
            None => eval::lookup(record, &self.field),
        };
        eval::apply(self.op, actual, &self.value)
    }

    pub fn reads_context(&self) -> bool {
        self.field.starts_with(CONTEXT_PREFIX)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.field.trim().is_empty() {
            return Err(ConfigError::invalid("predicate field must not be empty"));
        }
        match self.op {
            FilterOp::In if !self.value.is_array() => Err(ConfigError::invalid(format!(
                "predicate on {} uses `in` with a non-array value",
                self.field
            ))),
            FilterOp::Matches => {
                let pattern = self.value.as_str().ok_or_else(|| {
                    ConfigError::invalid(format!(
                        "predicate on {} uses `matches` with a non-string pattern",
                        self.field
                    ))
                })?;
                regex::Regex::new(pattern).map(|_| ()).map_err(|e| {
                    ConfigError::invalid(format!("bad pattern on {}: {e}", self.field))
                })
            }
            _ => Ok(()),
        }
    }
}

/// Conjunction of predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    clauses: Vec<Predicate>,
}

impl Filter {
    /// The filter that matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_clauses(clauses: Vec<Predicate>) -> Self {
        Self { clauses }
    }

    /// Builder form: append one predicate.
    pub fn with(mut self, predicate: Predicate) -> Self {
        self.clauses.push(predicate);
        self
    }

    /// Logical AND of two filters, preserving clause order (self first).
    pub fn and(mut self, other: &Filter) -> Self {
        self.clauses.extend(other.clauses.iter().cloned());
        self
    }

    pub fn clauses(&self) -> &[Predicate] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn matches(
        &self,
        record: &serde_json::Map<String, Value>,
        context: &BTreeMap<String, Value>,
    ) -> bool {
        self.clauses.iter().all(|p| p.evaluate(record, context))
    }

    /// Number of clauses that hold. Used for partial trigger matching.
    pub fn count_matching(
        &self,
        record: &serde_json::Map<String, Value>,
        context: &BTreeMap<String, Value>,
    ) -> usize {
        self.clauses
            .iter()
            .filter(|p| p.evaluate(record, context))
            .count()
    }

    /// Evaluate every `context.` clause now. Returns the record-level
    /// remainder and whether all context clauses held.
    pub fn resolve_context(&self, context: &BTreeMap<String, Value>) -> (Filter, bool) {
        let empty = serde_json::Map::new();
        let mut holds = true;
        let mut remainder = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            if clause.reads_context() {
                holds &= clause.evaluate(&empty, context);
            } else {
                remainder.push(clause.clone());
            }
        }
        (Filter::from_clauses(remainder), holds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clauses.iter().try_for_each(Predicate::validate)
    }
}

impl From<Vec<Predicate>> for Filter {
    fn from(clauses: Vec<Predicate>) -> Self {
        Self::from_clauses(clauses)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn empty_filter_matches_everything() {
        let r = record(json!({"a": 1}));
        assert!(Filter::all().matches(&r, &BTreeMap::new()));
    }

    #[test]
    fn and_concatenates_in_order() {
        let a = Filter::all().with(Predicate::equals("a", 1));
        let b = Filter::all().with(Predicate::equals("b", 2));
        let merged = a.and(&b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.clauses()[0].field, "a");
        assert_eq!(merged.clauses()[1].field, "b");
    }

    #[test]
    fn numeric_and_string_comparisons() {
        let r = record(json!({"score": 0.7, "status": "active", "tags": ["x", "y"]}));
        let ctx = BTreeMap::new();
        assert!(Predicate::new("score", FilterOp::Gte, 0.5).evaluate(&r, &ctx));
        assert!(!Predicate::new("score", FilterOp::Lt, 0.5).evaluate(&r, &ctx));
        let any_of = json!(["active", "new"]);
        assert!(Predicate::new("status", FilterOp::In, any_of).evaluate(&r, &ctx));
        assert!(Predicate::new("tags", FilterOp::Contains, "y").evaluate(&r, &ctx));
        assert!(Predicate::new("status", FilterOp::Ne, "archived").evaluate(&r, &ctx));
        assert!(Predicate::new("missing", FilterOp::Exists, false).evaluate(&r, &ctx));
    }

    #[test]
    fn integer_and_float_compare_equal() {
        let r = record(json!({"n": 3}));
        assert!(Predicate::equals("n", 3.0).evaluate(&r, &BTreeMap::new()));
    }

    #[test]
    fn context_prefix_reads_runtime_context() {
        let r = record(json!({}));
        let mut ctx = BTreeMap::new();
        ctx.insert("intent".to_string(), json!("debug"));
        assert!(Predicate::equals("context.intent", "debug").evaluate(&r, &ctx));
        assert!(!Predicate::equals("context.intent", "plan").evaluate(&r, &ctx));
    }

    #[test]
    fn resolve_context_splits_clauses() {
        let mut ctx = BTreeMap::new();
        ctx.insert("intent".to_string(), json!("debug"));
        let f = Filter::all()
            .with(Predicate::equals("context.intent", "debug"))
            .with(Predicate::equals("status", "active"));
        let (rest, holds) = f.resolve_context(&ctx);
        assert!(holds);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest.clauses()[0].field, "status");

        ctx.insert("intent".to_string(), json!("plan"));
        assert!(!f.resolve_context(&ctx).1);
    }

    #[test]
    fn dotted_path_reads_nested_objects() {
        let r = record(json!({"meta": {"lang": "rust"}}));
        assert!(Predicate::equals("meta.lang", "rust").evaluate(&r, &BTreeMap::new()));
    }

    #[test]
    fn regex_match_and_validation() {
        let r = record(json!({"path": "src/lib.rs"}));
        assert!(Predicate::new("path", FilterOp::Matches, r"\.rs$").evaluate(&r, &BTreeMap::new()));
        let bad = Filter::all().with(Predicate::new("path", FilterOp::Matches, "("));
        assert!(bad.validate().is_err());
        let bad_in = Filter::all().with(Predicate::new("x", FilterOp::In, 3));
        assert!(bad_in.validate().is_err());
    }

    #[test]
    fn deserializes_from_toml_array() {
        #[derive(Deserialize)]
        struct Wrapper {
            filter: Filter,
        }
        let w: Wrapper = toml::from_str(
            r#"filter = [
                { field = "status", value = "active" },
                { field = "rank", op = "gt", value = 2 },
            ]"#,
        )
        .unwrap();
        assert_eq!(w.filter.len(), 2);
        assert_eq!(w.filter.clauses()[0].op, FilterOp::Eq);
        assert_eq!(w.filter.clauses()[1].op, FilterOp::Gt);
    }
}

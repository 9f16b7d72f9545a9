use explore_core::config::*;
use explore_core::filter::FilterOp;

const FULL: &str = r#"
name = "agent_context"
version = 3
description = "Context for coding agents"

[[sources]]
alias = "knowledge"
memory_type = "semantic"
required = true
capabilities = ["vector", "keyword"]
filter = [{ field = "archived", value = false }]

[[sources]]
alias = "events"
memory_type = "episodic"
timestamp_field = "occurred_at"

[[sources]]
alias = "skills"
memory_type = "procedural"

[[joins]]
name = "mentions"
from = "events"
to = "knowledge"
kind = "graph_path"
depth = 2
edge_types = ["mentions"]
filter = [{ field = "confidence", op = "gte", value = 0.5 }]

[fields.knowledge]
include = ["title", "body", "secret"]
exclude = ["secret"]
rename = { body = "content" }
conditional = [{ field = "debug_notes", when = [{ field = "context.mode", value = "debug" }] }]

[default]
method = "hybrid"

[[default.components]]
type = "vector_search"
weight = 0.5
source = "knowledge"
k = 10
threshold = 0.2

[[default.components]]
type = "recency"
weight = 0.5
source = ["events"]
decay_rate = 0.001

[strategies.graph_first]
method = "graph"

[[strategies.graph_first.components]]
type = "graph_traversal"
weight = 1.0
via = "mentions"

[limits]
default = 5
max = 20

[limits.token_budget]
max_tokens = 400
priority = ["skills", "knowledge"]

[cache]
ttl_secs = 60
invalidation = "write_behind"
scope = "record"
"#;

#[test]
fn full_config_round_trips_through_toml() {
    let cfg = RetrievalConfig::from_toml_str(FULL).expect("valid config");
    assert_eq!(cfg.id(), "agent_context@v3");
    assert_eq!(cfg.sources.len(), 3);
    assert!(cfg.source("knowledge").unwrap().required);
    assert!(!cfg.source("events").unwrap().required);
    assert_eq!(cfg.source("events").unwrap().timestamp_field(), "occurred_at");
    assert_eq!(cfg.source("skills").unwrap().timestamp_field(), "timestamp");
    assert!(!cfg.source("knowledge").unwrap().supports(Capability::Graph));
    assert!(cfg.source("skills").unwrap().supports(Capability::Graph));

    let join = cfg.find_join("mentions").unwrap();
    assert_eq!(join.kind, JoinKind::GraphPath);
    assert_eq!(join.filter.clauses()[0].op, FilterOp::Gte);

    let fields = &cfg.fields["knowledge"];
    assert_eq!(fields.rename["body"], "content");
    assert_eq!(fields.conditional[0].field, "debug_notes");

    assert_eq!(cfg.default.components.len(), 2);
    assert_eq!(
        cfg.strategy_named("graph_first").unwrap().method,
        RetrievalMethod::Graph
    );

    let budget = cfg.limits.active_token_budget().unwrap();
    assert!(budget.enabled);
    assert_eq!(budget.priority, vec!["skills", "knowledge"]);

    assert_eq!(cfg.cache.invalidation, InvalidationMode::WriteBehind);
    assert_eq!(cfg.cache.scope, InvalidationScope::Record);

    let serialized = toml::to_string(&cfg).expect("serializes");
    let reparsed = RetrievalConfig::from_toml_str(&serialized).expect("reparses");
    assert_eq!(reparsed, cfg);
}

#[test]
fn json_config_is_accepted() {
    let cfg = RetrievalConfig::from_toml_str(FULL).unwrap();
    let json = serde_json::to_string(&cfg).unwrap();
    let parsed = RetrievalConfig::from_json_str(&json).unwrap();
    assert_eq!(parsed, cfg);
}

#[test]
fn out_of_range_weight_is_rejected() {
    let src = FULL.replace(
        "weight = 0.5\nsource = \"knowledge\"",
        "weight = 1.5\nsource = \"knowledge\"",
    );
    assert!(RetrievalConfig::from_toml_str(&src).is_err());
}

#[test]
fn unresolvable_join_is_rejected() {
    let src = FULL.replace("via = \"mentions\"", "via = \"nowhere\"");
    let err = RetrievalConfig::from_toml_str(&src).unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn settings_default_when_sections_missing() {
    let settings = ExploreSettings::from_toml_str("[engine]\nper_call_timeout_ms = 50\n").unwrap();
    assert_eq!(settings.engine.per_call_timeout_ms, 50);
    assert_eq!(
        settings.engine.cache_capacity,
        defaults::DEFAULT_CACHE_CAPACITY
    );
    assert_eq!(settings.engine.token_counter, TokenCounterKind::Words);
    assert_eq!(settings.engine.slow_query_ms, defaults::DEFAULT_SLOW_QUERY_MS);
    assert_eq!(settings.observability.log_level, "info");
}

#[test]
fn bad_settings_surface_parse_error() {
    let err =
        ExploreSettings::from_toml_str("[engine]\nper_call_timeout_ms = \"soon\"\n").unwrap_err();
    assert!(matches!(err, explore_core::errors::ConfigError::Parse { .. }));
}

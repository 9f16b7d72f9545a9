/// Explore engine version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hard ceiling on graph traversal depth, whatever the config asks for.
pub const MAX_GRAPH_DEPTH: u32 = 16;

/// Tolerance used when checking that normalized weights sum to 1.
pub const WEIGHT_EPSILON: f64 = 1e-9;

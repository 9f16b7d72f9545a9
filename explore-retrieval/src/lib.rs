//! # explore-retrieval
//!
//! The explore engine. Plan, fan out, fuse, pack.
//! Named explores combine weighted retrieval components across sources;
//! results are cached per query with single-flight and write-path invalidation.
//!
//! ## Architecture
//!
//! ```text
//! ExploreEngine
//! ├── ConfigRegistry (versioned explores)
//! ├── Planner
//! │   ├── Strategy selection
//! │   ├── Source resolution (explicit or by capability)
//! │   ├── Filter merge (source AND join AND component AND runtime)
//! │   └── Weight normalization
//! ├── Executors (concurrent, per-call timeout)
//! │   ├── vector_search
//! │   ├── keyword_search
//! │   ├── graph_traversal
//! │   ├── recency
//! │   ├── importance
//! │   └── procedural_match
//! ├── Fusion (weighted sum, deterministic tie-break)
//! ├── BudgetAllocator
//! │   ├── Field selection (include, exclude, when, rename)
//! │   └── Priority tiers (skip what does not fit)
//! └── ResultCache (explore-cache)
//! ```

pub mod budget;
pub mod engine;
pub mod executors;
pub mod fusion;
pub mod planner;
pub mod registry;

pub use budget::{Allocation, BudgetAllocator};
pub use engine::ExploreEngine;
pub use fusion::{fuse, ComponentOutput};
pub use planner::{plan, ExecutionPlan, PlannedCall};
pub use registry::ConfigRegistry;

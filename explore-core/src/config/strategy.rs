use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::defaults;
use crate::filter::{Filter, Predicate};

/// Retrieval method tag of a strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    Vector,
    Graph,
    #[default]
    Hybrid,
    Keyword,
}

/// Backend capability a component needs from a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Vector,
    Keyword,
    Graph,
    Scalar,
}

/// Closed set of retrieval component types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentType {
    VectorSearch,
    KeywordSearch,
    GraphTraversal,
    Recency,
    Importance,
    ProceduralMatch,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        Self::VectorSearch,
        Self::KeywordSearch,
        Self::GraphTraversal,
        Self::Recency,
        Self::Importance,
        Self::ProceduralMatch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::VectorSearch => "vector_search",
            Self::KeywordSearch => "keyword_search",
            Self::GraphTraversal => "graph_traversal",
            Self::Recency => "recency",
            Self::Importance => "importance",
            Self::ProceduralMatch => "procedural_match",
        }
    }

    pub fn capability(self) -> Capability {
        match self {
            Self::VectorSearch => Capability::Vector,
            Self::KeywordSearch => Capability::Keyword,
            Self::GraphTraversal => Capability::Graph,
            Self::Recency | Self::Importance | Self::ProceduralMatch => Capability::Scalar,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance metric used by `vector_search`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Dot,
    Euclidean,
}

impl DistanceMetric {
    /// Map a backend-native score into a similarity in [0, 1].
    pub fn to_similarity(self, native: f64) -> f64 {
        let sim = match self {
            Self::Cosine => (1.0 + native) / 2.0,
            Self::Dot => native,
            Self::Euclidean => 1.0 / (1.0 + native.max(0.0)),
        };
        if sim.is_finite() {
            sim.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Translate a similarity threshold into the metric's native space.
    ///
    /// For `Euclidean` the result is a maximum distance; for the others a
    /// minimum score.
    pub fn native_threshold(self, similarity: f64) -> f64 {
        match self {
            Self::Cosine => 2.0 * similarity - 1.0,
            Self::Dot => similarity,
            Self::Euclidean if similarity <= 0.0 => f64::INFINITY,
            Self::Euclidean => 1.0 / similarity - 1.0,
        }
    }
}

/// Type tag plus type-specific options of a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    VectorSearch {
        #[serde(default = "defaults::vector_k")]
        k: usize,
        #[serde(default = "defaults::vector_threshold")]
        threshold: f64,
        #[serde(default)]
        metric: DistanceMetric,
    },
    KeywordSearch {
        /// Fields to search; empty means the backend's default text fields.
        #[serde(default)]
        fields: Vec<String>,
        #[serde(default = "defaults::keyword_boost")]
        boost: f64,
    },
    GraphTraversal {
        #[serde(default, alias = "max_depth")]
        depth: Option<u32>,
        #[serde(default)]
        edge_types: Vec<String>,
    },
    Recency {
        decay_rate: f64,
        /// Timestamp field; falls back to the source's `timestamp_field`.
        #[serde(default)]
        field: Option<String>,
    },
    Importance {
        #[serde(default = "defaults::importance_field")]
        field: String,
    },
    ProceduralMatch {
        #[serde(default)]
        conditions: Vec<Predicate>,
    },
}

impl ComponentKind {
    pub fn component_type(&self) -> ComponentType {
        match self {
            Self::VectorSearch { .. } => ComponentType::VectorSearch,
            Self::KeywordSearch { .. } => ComponentType::KeywordSearch,
            Self::GraphTraversal { .. } => ComponentType::GraphTraversal,
            Self::Recency { .. } => ComponentType::Recency,
            Self::Importance { .. } => ComponentType::Importance,
            Self::ProceduralMatch { .. } => ComponentType::ProceduralMatch,
        }
    }
}

/// One weighted scoring component of a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalComponent {
    #[serde(flatten)]
    pub kind: ComponentKind,
    #[serde(default = "defaults::component_weight")]
    pub weight: f64,
    /// Source aliases this component targets; empty means every capable source.
    #[serde(default, deserialize_with = "one_or_many")]
    pub source: Vec<String>,
    #[serde(default)]
    pub filter: Filter,
    /// Join reference (join name or `from.to`) whose filter applies.
    #[serde(default)]
    pub via: Option<String>,
}

impl RetrievalComponent {
    pub fn new(kind: ComponentKind, weight: f64) -> Self {
        Self {
            kind,
            weight,
            source: Vec::new(),
            filter: Filter::all(),
            via: None,
        }
    }

    pub fn on_source(mut self, alias: impl Into<String>) -> Self {
        self.source.push(alias.into());
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn via(mut self, join: impl Into<String>) -> Self {
        self.via = Some(join.into());
        self
    }

    pub fn component_type(&self) -> ComponentType {
        self.kind.component_type()
    }
}

/// A method tag plus an ordered list of components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalStrategy {
    #[serde(default)]
    pub method: RetrievalMethod,
    #[serde(default)]
    pub components: Vec<RetrievalComponent>,
}

impl RetrievalStrategy {
    pub fn new(method: RetrievalMethod, components: Vec<RetrievalComponent>) -> Self {
        Self { method, components }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

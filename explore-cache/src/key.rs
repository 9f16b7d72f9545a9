use std::fmt;

use explore_core::models::RuntimeQuery;
use serde::{Deserialize, Serialize};

/// Stable hash of everything that determines a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key over explore id (`name@vN`), strategy, normalized text, sorted
    /// filters, effective limit, seeds, sorted context and embedding.
    pub fn compute(explore_id: &str, strategy: &str, query: &RuntimeQuery, limit: usize) -> Self {
        let mut hasher = blake3::Hasher::new();
        let mut field = |label: &str, value: &str| {
            hasher.update(label.as_bytes());
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        };

        field("explore", explore_id);
        field("strategy", strategy);
        field("text", query.normalized_text().as_deref().unwrap_or(""));
        // BTreeMap iteration is sorted; serde_json renders maps in key order.
        for (name, value) in &query.filters {
            field("filter", &format!("{name}={value}"));
        }
        field("limit", &limit.to_string());

        let mut seeds: Vec<&str> = query.seeds.iter().map(String::as_str).collect();
        seeds.sort_unstable();
        seeds.dedup();
        for seed in seeds {
            field("seed", seed);
        }
        for (name, value) in &query.context {
            field("context", &format!("{name}={value}"));
        }
        if let Some(embedding) = &query.embedding {
            let bytes: Vec<u8> = embedding.iter().flat_map(|f| f.to_le_bytes()).collect();
            field("embedding", blake3::hash(&bytes).to_hex().as_str());
        }

        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for logs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

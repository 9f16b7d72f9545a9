use std::collections::HashMap;

use async_trait::async_trait;
use explore_core::errors::BackendError;
use explore_core::traits::QueryEmbedder;

/// Embedder backed by a fixed text-to-vector table. Unknown text fails
/// as unavailable.
#[derive(Debug, Default, Clone)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl QueryEmbedder for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError> {
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| BackendError::Unavailable {
                reason: format!("no embedding for {text:?}"),
            })
    }
}

use async_trait::async_trait;

use crate::errors::BackendError;

/// Turns query text into an embedding when the caller did not supply one.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, BackendError>;
}

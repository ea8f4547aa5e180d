//! Text embedding abstraction.
//!
//! The index and the session talk to an [`Embedder`]; the default
//! implementation runs a sentence-transformer locally through ONNX Runtime.

mod onnx;

pub use onnx::OnnxEmbedder;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::error::{EmbeddingError, ModelError};
use crate::models::EmbeddingConfig;

/// Maps text to fixed-dimension vectors. Must be deterministic for a given model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))
    }

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

static SHARED_EMBEDDER: OnceLock<Arc<OnnxEmbedder>> = OnceLock::new();

/// Process-wide embedding model, loaded on first use.
///
/// Later calls return the already-loaded model regardless of `config`.
pub fn shared_embedder(config: &EmbeddingConfig) -> Result<Arc<OnnxEmbedder>, ModelError> {
    if let Some(embedder) = SHARED_EMBEDDER.get() {
        return Ok(Arc::clone(embedder));
    }

    let loaded = Arc::new(OnnxEmbedder::load(config)?);
    // A concurrent first call may have won the race; keep whichever landed.
    Ok(Arc::clone(SHARED_EMBEDDER.get_or_init(|| loaded)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::HashEmbedder;

    #[tokio::test]
    async fn test_embed_single_uses_batch() {
        let embedder = HashEmbedder::new(8);
        let single = embedder.embed("photosynthesis").await.unwrap();
        let batch = embedder
            .embed_batch(&["photosynthesis".to_string()])
            .await
            .unwrap();
        assert_eq!(single, batch[0]);
        assert_eq!(single.len(), 8);
    }

    #[tokio::test]
    async fn test_embed_rejects_blank_text() {
        let embedder = HashEmbedder::new(8);
        assert!(matches!(
            embedder.embed("   ").await,
            Err(EmbeddingError::EmptyInput)
        ));
    }
}

//! FastEmbed embedding provider.
//!
//! `fastembed::TextEmbedding` is neither `Send` nor `Sync` across calls, so
//! the model sits behind `Arc<Mutex<>>` and every call runs on
//! `tokio::task::spawn_blocking`.
//!
//! Requires the `vector-fastembed` feature.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sift_core::{Error, Result, Source};

use crate::embedding::EmbeddingProvider;

/// Map a model name to a fastembed model.
fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" | "AllMiniLML6V2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" | "BGESmallENV15" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" | "BGEBaseENV15" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        other => Err(Error::config(format!(
            "Unknown embedding model: '{other}'. Supported: all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5"
        ))),
    }
}

/// Local transformer embeddings via fastembed.
///
/// | Name | Dimension |
/// |------|-----------|
/// | `all-minilm-l6-v2` | 384 |
/// | `bge-small-en-v1.5` | 384 |
/// | `bge-base-en-v1.5` | 768 |
pub struct FastEmbedProvider {
    model: Arc<Mutex<fastembed::TextEmbedding>>,
    dimension: usize,
    model_name: String,
}

impl FastEmbedProvider {
    /// Load `model_name`, downloading it into `cache_path` if needed.
    pub fn new(model_name: &str, cache_path: Option<&str>) -> Result<Self> {
        let mut init = fastembed::InitOptions::new(resolve_model(model_name)?);
        if let Some(path) = cache_path {
            init = init.with_cache_dir(std::path::PathBuf::from(path));
        }

        let mut text_embedding = fastembed::TextEmbedding::try_new(init)
            .map_err(|e| Error::operation(format!("Failed to initialize fastembed model: {e}")))?;

        let probe = text_embedding
            .embed(vec!["dimension probe"], None)
            .map_err(|e| Error::operation(format!("Failed to probe embedding dimension: {e}")))?;
        let dimension = probe
            .first()
            .map(|v| v.len())
            .ok_or_else(|| Error::operation("Empty probe embedding"))?;

        log::info!("Loaded embedding model {model_name} (dimension {dimension})");
        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            dimension,
            model_name: model_name.to_string(),
        })
    }

    async fn run(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|e| Error::operation(format!("Mutex poisoned: {e}")))?;
            model
                .embed(texts, None)
                .map_err(|e| Error::retrieval(Source::Vector, format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| Error::operation(format!("spawn_blocking failed: {e}")))?
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.run(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::retrieval(Source::Vector, "no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.run(texts.iter().map(|t| t.to_string()).collect()).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("model", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model() {
        assert!(resolve_model("all-minilm-l6-v2").is_ok());
        assert!(resolve_model("AllMiniLML6V2").is_ok());
        assert!(resolve_model("bge-base-en-v1.5").is_ok());
        let err = resolve_model("nonexistent-model").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding model"));
    }

    #[tokio::test]
    #[ignore = "requires model download (~90MB)"]
    async fn test_fastembed_embed_single() {
        let provider = FastEmbedProvider::new("all-minilm-l6-v2", None).unwrap();
        assert_eq!(provider.dimension(), 384);
        let embedding = provider.embed("healthcare policy").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}

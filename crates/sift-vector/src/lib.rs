//! Vector retrieval for Sift.
//!
//! This crate provides the vector half of hybrid search: pluggable
//! embedding providers and a nearest-neighbor backend.
//!
//! # Features
//!
//! - `vector-fastembed`: Enable local embedding generation via fastembed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 sift-vector                  │
//! ├──────────────────────────────────────────────┤
//! │  EmbeddingProvider trait                     │
//! │  ├── MockEmbeddingProvider (always)          │
//! │  └── FastEmbedProvider (vector-fastembed)    │
//! ├──────────────────────────────────────────────┤
//! │  VectorBackend trait                         │
//! │  └── SimpleVectorBackend (in-memory cosine)  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod embedding;
pub mod types;

#[cfg(feature = "vector-fastembed")]
pub mod fastembed;

pub use backend::{SimpleVectorBackend, VectorBackend};
pub use embedding::{cosine_similarity, EmbeddingProvider, MockEmbeddingProvider};
pub use types::{VectorConfig, VectorDocument};

#[cfg(feature = "vector-fastembed")]
pub use fastembed::FastEmbedProvider;

use std::sync::Arc;

use sift_core::{Error, Result};

/// Create an embedding provider from configuration.
pub fn create_embedding_provider(config: &VectorConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "mock" => Ok(Arc::new(MockEmbeddingProvider::new(config.dimension))),
        #[cfg(feature = "vector-fastembed")]
        "fastembed" => Ok(Arc::new(FastEmbedProvider::new(
            &config.model,
            config.cache_path.as_deref(),
        )?)),
        #[cfg(not(feature = "vector-fastembed"))]
        "fastembed" => Err(Error::config(
            "provider 'fastembed' requires the vector-fastembed feature",
        )),
        other => Err(Error::config(format!(
            "Unknown embedding provider: '{other}'. Supported: mock, fastembed"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_mock_provider() {
        let config = VectorConfig {
            dimension: 12,
            ..Default::default()
        };
        let provider = create_embedding_provider(&config).unwrap();
        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.dimension(), 12);
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = VectorConfig {
            provider: "openai".into(),
            ..Default::default()
        };
        let err = create_embedding_provider(&config).err().unwrap();
        assert_eq!(err.kind(), "config");
    }
}

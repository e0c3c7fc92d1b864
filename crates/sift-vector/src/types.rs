//! Configuration and document types for vector retrieval.

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Vector retrieval configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Whether vector retrieval is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Embedding provider: "mock" or "fastembed".
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Embedding model name (fastembed only).
    #[serde(default = "default_model")]
    pub model: String,

    /// Embedding dimension (mock provider only; fastembed probes its model).
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Directory for downloaded model files.
    #[serde(default)]
    pub cache_path: Option<String>,

    /// Batch size for corpus embedding.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Hits at or below this cosine similarity are not considered matches.
    #[serde(default)]
    pub min_similarity: f32,
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "all-minilm-l6-v2".to_string()
}

fn default_dimension() -> usize {
    384
}

fn default_batch_size() -> usize {
    64
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            provider: default_provider(),
            model: default_model(),
            dimension: default_dimension(),
            cache_path: None,
            batch_size: default_batch_size(),
            min_similarity: 0.0,
        }
    }
}

// ============================================================================
// Documents
// ============================================================================

/// A document prepared for embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDocument {
    /// Unique document identifier.
    pub id: String,

    /// Text to embed.
    pub text: String,
}

impl VectorDocument {
    /// Create a new vector document.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

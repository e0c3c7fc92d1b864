//! Error types for Sift operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Sift crates. Uses `thiserror` for derive macros.
//!
//! The variants follow the service's failure taxonomy:
//!
//! - [`Error::Validation`]: malformed input, rejected immediately, never retried
//! - [`Error::RetrievalUnavailable`]: every retrieval source failed
//! - [`Error::Retrieval`]: a single retrieval call failed (the combiner turns
//!   this into a degraded response when the other source survives)
//! - [`Error::ReferentialIntegrity`]: feedback referencing an unknown search log
//!
//! Infrastructure failures (storage, I/O, configuration) have their own variants.

use thiserror::Error;

use crate::types::Source;

/// Errors that can occur in Sift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input (empty query, non-positive limit, invalid rating, invalid window).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single retrieval call failed (transport error, timeout, embedding failure).
    #[error("{retriever} retrieval failed: {message}")]
    Retrieval {
        /// The retrieval path that failed.
        retriever: Source,
        /// Failure description.
        message: String,
    },

    /// Both retrieval sources failed; no partial result is returned.
    #[error("Retrieval unavailable (lexical: {lexical}; vector: {vector})")]
    RetrievalUnavailable {
        /// Why the lexical call failed.
        lexical: String,
        /// Why the vector call failed.
        vector: String,
    },

    /// Feedback referenced a search log that does not exist.
    #[error("Referential integrity error: search log {log_id} does not exist")]
    ReferentialIntegrity {
        /// The unknown search log identifier.
        log_id: i64,
    },

    /// Durable event store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with path context.
    #[error("I/O error at {path}: {source}")]
    IoWithPath {
        /// The file involved.
        path: std::path::PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Resource kind.
        resource: String,
        /// Resource identifier.
        id: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic operation failure from a backend library.
    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a single-source retrieval error.
    pub fn retrieval(retriever: Source, msg: impl Into<String>) -> Self {
        Self::Retrieval {
            retriever,
            message: msg.into(),
        }
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }

    /// Create an I/O error carrying the offending path.
    pub fn io_with_path(source: std::io::Error, path: impl Into<std::path::PathBuf>) -> Self {
        Self::IoWithPath {
            path: path.into(),
            source,
        }
    }

    /// Whether this is an input validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this is a referential integrity rejection.
    pub fn is_referential_integrity(&self) -> bool {
        matches!(self, Self::ReferentialIntegrity { .. })
    }

    /// Whether a caller may reasonably retry the operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetrievalUnavailable { .. } | Self::Storage(_))
    }

    /// Short machine-readable kind, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Retrieval { .. } => "retrieval",
            Self::RetrievalUnavailable { .. } => "retrieval_unavailable",
            Self::ReferentialIntegrity { .. } => "referential_integrity",
            Self::Storage(_) => "storage",
            Self::Io(_) | Self::IoWithPath { .. } => "io",
            Self::Config(_) => "config",
            Self::NotFound { .. } => "not_found",
            Self::Serialization(_) => "serialization",
            Self::Operation(_) => "operation",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using Sift's Error type.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display() {
        let err = Error::validation("query must not be empty");
        assert_eq!(
            err.to_string(),
            "Validation error: query must not be empty"
        );
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retrieval_display_names_source() {
        let err = Error::retrieval(Source::Vector, "timed out after 2000ms");
        assert_eq!(
            err.to_string(),
            "vector retrieval failed: timed out after 2000ms"
        );
        assert_eq!(err.kind(), "retrieval");
    }

    #[test]
    fn test_retrieval_unavailable_is_retryable() {
        let err = Error::RetrievalUnavailable {
            lexical: "connection refused".into(),
            vector: "timed out".into(),
        };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("connection refused"));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_referential_integrity() {
        let err = Error::ReferentialIntegrity { log_id: 999_999_999 };
        assert!(err.is_referential_integrity());
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("999999999"));
        assert_eq!(err.kind(), "referential_integrity");
    }

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("Index", "/tmp/missing");
        assert_eq!(err.to_string(), "Index not found: /tmp/missing");
    }

    #[test]
    fn test_io_with_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io_with_path(io, "/data/corpus.jsonl");
        assert!(err.to_string().contains("/data/corpus.jsonl"));
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_from_serde_json() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{oops");
        let err: Error = parse.unwrap_err().into();
        assert_eq!(err.kind(), "serialization");
    }
}

//! Lexical retrieval for Sift.
//!
//! This crate provides the lexical half of hybrid search: the
//! [`LexicalBackend`] trait, an in-memory BM25 implementation, and a Tantivy
//! backend (feature-gated).
//!
//! # Features
//!
//! - `fts-tantivy`: Enable the Tantivy-based backend and index builder
//!
//! # Field weighting
//!
//! Both backends score title matches ×3, excerpt matches ×2, and body
//! matches ×1.

pub mod backend;
pub mod document;

#[cfg(feature = "fts-tantivy")]
pub mod indexer;
#[cfg(feature = "fts-tantivy")]
pub mod query;
#[cfg(feature = "fts-tantivy")]
pub mod schema;
#[cfg(feature = "fts-tantivy")]
pub mod tantivy_search;

pub use backend::{LexicalBackend, SimpleLexicalBackend};
pub use document::{load_jsonl, tokenize, LexicalDocument};

#[cfg(feature = "fts-tantivy")]
pub use indexer::{build_index, Indexer};
#[cfg(feature = "fts-tantivy")]
pub use schema::SearchSchema;
#[cfg(feature = "fts-tantivy")]
pub use tantivy_search::TantivySearch;

//! Query normalization and hybrid ranking for Sift.
//!
//! - [`normalizer`]: cleans raw query text, applies spell correction to the
//!   lexical path, and resolves the effective search mode
//! - [`fusion`]: pure min-max normalization, weighted fusion, and ranking
//! - [`combiner`]: concurrent fan-out to the retrieval sources with
//!   per-call timeouts and graceful degradation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sift_core::{SearchMode, Weights};
//! use sift_query::{HybridCombiner, QueryNormalizer};
//!
//! let combiner = HybridCombiner::new(lexical).with_vector(embedder, vectors);
//! let query = QueryNormalizer::new().normalize("Election results")?;
//! let response = combiner
//!     .search(&query, SearchMode::Hybrid, Weights::default(), 10)
//!     .await?;
//! ```

pub mod combiner;
pub mod fusion;
pub mod normalizer;
pub mod spelling;
pub mod types;

pub use combiner::{HybridCombiner, SourceOutcome, DEFAULT_RETRIEVAL_TIMEOUT};
pub use fusion::{fuse, min_max_normalize, rank, single_source, Candidate};
pub use normalizer::{NormalizedQuery, QueryNormalizer};
pub use spelling::SpellCorrector;
pub use types::{CombinedResults, RankedResult};

//! Sift Core: shared types, traits, and errors.
//!
//! This crate provides the foundational types used across all Sift crates.
//! It has no internal Sift dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy and Result alias
//! - [`traits`]: Configuration abstraction
//! - [`types`]: Search modes, retrieval hits, and fusion weights

pub mod error;
pub mod traits;
pub mod types;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use traits::{ConfigProvider, SearchSettings};
pub use types::{validate_limit, RetrievalHit, SearchMode, Source, Weights};

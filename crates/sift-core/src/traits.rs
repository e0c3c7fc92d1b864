//! Core traits for Sift configuration abstraction.
//!
//! The primary trait is [`ConfigProvider`], which lets the service layer be
//! assembled from any configuration source (the CLI's TOML/env config, a
//! test fixture, an embedding application's own settings).

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{SearchMode, Weights};
use crate::Result;

/// Search behaviour knobs resolved from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Mode used when a request does not name one.
    pub default_mode: SearchMode,
    /// Result limit used when a request does not name one.
    pub default_limit: usize,
    /// Upper bound on a request's result limit.
    pub max_limit: usize,
    /// Hybrid weights used when a request does not supply any.
    pub weights: Weights,
    /// Bound on each individual retrieval call (embedding included).
    pub retrieval_timeout: Duration,
    /// Whether the lexical path receives a spell-corrected query.
    pub spell_check: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_mode: SearchMode::Hybrid,
            default_limit: 10,
            max_limit: 100,
            weights: Weights::default(),
            retrieval_timeout: Duration::from_millis(2000),
            spell_check: true,
        }
    }
}

/// Trait for deployment-specific configuration.
///
/// # Bounds
///
/// - `Send + Sync`: Configuration must be shareable across threads
/// - `Clone`: Configuration can be duplicated for passing to subsystems
/// - `'static`: Configuration lifetime is not borrowed
///
/// # Example
///
/// ```
/// use std::path::PathBuf;
/// use sift_core::traits::{ConfigProvider, SearchSettings};
/// use sift_core::Result;
///
/// #[derive(Clone)]
/// struct NewsroomConfig {
///     db: String,
/// }
///
/// impl ConfigProvider for NewsroomConfig {
///     fn project_name(&self) -> &str {
///         "newsroom"
///     }
///
///     fn search_settings(&self) -> SearchSettings {
///         SearchSettings::default()
///     }
///
///     fn database_url(&self) -> Result<String> {
///         Ok(self.db.clone())
///     }
///
///     fn content_path(&self) -> Option<PathBuf> {
///         None
///     }
/// }
/// ```
pub trait ConfigProvider: Send + Sync + Clone + 'static {
    /// The project name, used in logs and health output.
    fn project_name(&self) -> &str;

    /// Resolved search settings.
    fn search_settings(&self) -> SearchSettings;

    /// Connection URL of the durable event store.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be determined.
    fn database_url(&self) -> Result<String>;

    /// Path of the JSONL corpus feeding the in-memory backends, if any.
    fn content_path(&self) -> Option<PathBuf>;
}

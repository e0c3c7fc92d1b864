//! Configuration for the `sift` binary.
//!
//! [`SiftConfig`] loads from TOML files, environment variables, and defaults
//! using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `SIFT_CONFIG` environment variable
//! 3. XDG default: `~/.config/sift/config.toml`
//! 4. Built-in defaults
//!
//! `SIFT_<SECTION>_<KEY>` environment variables overlay the file.

use std::path::PathBuf;
use std::time::Duration;

use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use sift_api::AnalyticsSettings;
use sift_core::traits::{ConfigProvider, SearchSettings};
use sift_core::{Error, Result, SearchMode, Weights};
use sift_vector::VectorConfig;

/// Sections that accept environment overlays.
const ENV_SECTIONS: &[&str] = &[
    "search",
    "content",
    "fts",
    "vector",
    "storage",
    "analytics",
    "server",
];

// ============================================================================
// Configuration structs
// ============================================================================

/// Main configuration for the `sift` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiftConfig {
    /// Project name, shown in logs and `sift version`.
    pub project_name: String,

    pub search: SearchConfig,
    pub content: ContentConfig,
    pub fts: FtsConfig,
    pub vector: VectorConfig,
    pub storage: StorageConfig,
    pub analytics: AnalyticsConfig,
    pub server: ServerConfig,
}

/// Search behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_mode: SearchMode,
    pub default_limit: usize,
    pub max_limit: usize,
    pub lexical_weight: f32,
    pub vector_weight: f32,
    /// Per-call retrieval bound, embedding included.
    pub retrieval_timeout_ms: u64,
    pub spell_check: bool,
    /// Word list for spell correction (`word [frequency]` per line). When
    /// unset, the corpus vocabulary is used.
    pub dictionary_path: Option<String>,
}

/// Corpus location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// JSONL file, one `{"id", "title", "excerpt", "body"}` object per line.
    pub path: Option<String>,
}

/// Lexical backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FtsConfig {
    /// `simple` (in-memory BM25) or `tantivy`.
    pub backend: String,
    /// Tantivy index directory.
    pub index_path: Option<String>,
}

/// Event store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
}

/// Analytics defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub default_days: i64,
    pub top_n: usize,
    pub recent_k: usize,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

// ============================================================================
// Default implementations
// ============================================================================

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            project_name: "sift".to_string(),
            search: SearchConfig::default(),
            content: ContentConfig::default(),
            fts: FtsConfig::default(),
            vector: VectorConfig::default(),
            storage: StorageConfig::default(),
            analytics: AnalyticsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let settings = SearchSettings::default();
        Self {
            default_mode: settings.default_mode,
            default_limit: settings.default_limit,
            max_limit: settings.max_limit,
            lexical_weight: settings.weights.lexical,
            vector_weight: settings.weights.vector,
            retrieval_timeout_ms: settings.retrieval_timeout.as_millis() as u64,
            spell_check: settings.spell_check,
            dictionary_path: None,
        }
    }
}

impl Default for FtsConfig {
    fn default() -> Self {
        Self {
            backend: "simple".to_string(),
            index_path: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://sift.db".to_string(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        let defaults = AnalyticsSettings::default();
        Self {
            default_days: defaults.default_days,
            top_n: defaults.top_n,
            recent_k: defaults.recent_k,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl From<&AnalyticsConfig> for AnalyticsSettings {
    fn from(config: &AnalyticsConfig) -> Self {
        Self {
            default_days: config.default_days,
            top_n: config.top_n,
            recent_k: config.recent_k,
        }
    }
}

// ============================================================================
// Config loading
// ============================================================================

impl SiftConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level("SIFT");
        for section in ENV_SECTIONS {
            env_opts.add_section(*section);
        }
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no search could run with.
    pub fn validate(&self) -> Result<()> {
        if self.search.default_limit == 0 || self.search.max_limit == 0 {
            return Err(Error::config("search limits must be positive"));
        }
        if self.search.default_limit > self.search.max_limit {
            return Err(Error::config(format!(
                "search.default_limit ({}) exceeds search.max_limit ({})",
                self.search.default_limit, self.search.max_limit
            )));
        }
        Weights::new(self.search.lexical_weight, self.search.vector_weight)
            .validate()
            .map_err(|e| Error::config(format!("search weights: {e}")))?;
        if self.analytics.default_days <= 0 {
            return Err(Error::config("analytics.default_days must be positive"));
        }
        if !matches!(self.fts.backend.as_str(), "simple" | "tantivy") {
            return Err(Error::config(format!(
                "Unknown fts backend: '{}'. Supported: simple, tantivy",
                self.fts.backend
            )));
        }
        Ok(())
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var("SIFT_CONFIG") {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sift").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }

    /// Flatten this config into environment variable pairs with `SIFT_` prefix.
    pub fn to_env_vars(&self) -> Result<Vec<(String, String)>> {
        let value: toml::Value =
            toml::Value::try_from(self).map_err(|e| Error::config(e.to_string()))?;
        let mut vars = Vec::new();
        flatten_toml_value(&value, "SIFT", &mut vars);
        Ok(vars)
    }

    /// Listen address for `sift serve`.
    pub fn server_addr(&self) -> Result<std::net::SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                Error::config(format!(
                    "invalid server address {}:{}: {e}",
                    self.server.host, self.server.port
                ))
            })
    }
}

// ============================================================================
// ConfigProvider implementation
// ============================================================================

impl ConfigProvider for SiftConfig {
    fn project_name(&self) -> &str {
        &self.project_name
    }

    fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            default_mode: self.search.default_mode,
            default_limit: self.search.default_limit,
            max_limit: self.search.max_limit,
            weights: Weights::new(self.search.lexical_weight, self.search.vector_weight),
            retrieval_timeout: Duration::from_millis(self.search.retrieval_timeout_ms),
            spell_check: self.search.spell_check,
        }
    }

    fn database_url(&self) -> Result<String> {
        let url = self.storage.database_url.trim();
        if url.is_empty() {
            return Err(Error::config("storage.database_url is not set"));
        }
        Ok(url.to_string())
    }

    fn content_path(&self) -> Option<PathBuf> {
        self.content.path.as_ref().map(PathBuf::from)
    }
}

// ============================================================================
// Helper: flatten TOML to env vars
// ============================================================================

/// Recursively flatten a TOML value into `KEY=value` pairs.
fn flatten_toml_value(value: &toml::Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::Table(table) => {
            for (key, val) in table {
                flatten_toml_value(val, &format!("{prefix}_{}", key.to_uppercase()), out);
            }
        }
        toml::Value::Array(arr) => {
            if let Ok(json) = serde_json::to_string(arr) {
                out.push((prefix.to_string(), json));
            }
        }
        toml::Value::String(s) => out.push((prefix.to_string(), s.clone())),
        toml::Value::Integer(i) => out.push((prefix.to_string(), i.to_string())),
        toml::Value::Float(f) => out.push((prefix.to_string(), f.to_string())),
        toml::Value::Boolean(b) => out.push((prefix.to_string(), b.to_string())),
        toml::Value::Datetime(dt) => out.push((prefix.to_string(), dt.to_string())),
    }
}

// ============================================================================
// Tests
// ============================================================================

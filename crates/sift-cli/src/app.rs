//! The `sift` application: service assembly and command dispatch.
//!
//! [`build_service`] turns a [`SiftConfig`] into a ready [`SearchService`]:
//! corpus, lexical backend, optional vector path, spell corrector, and
//! event store. [`SiftCli::run`] dispatches parsed arguments to it.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use sift_api::{FeedbackRequest, SearchRequest, SearchResponse, SearchService};
use sift_core::traits::ConfigProvider;
use sift_core::{Error, Result};
use sift_fts::{load_jsonl, tokenize, LexicalBackend, LexicalDocument, SimpleLexicalBackend};
use sift_query::{HybridCombiner, QueryNormalizer, SpellCorrector};
use sift_storage::{Aggregator, EventStore, Window};
use sift_vector::{create_embedding_provider, SimpleVectorBackend, VectorDocument};
use tracing_subscriber::EnvFilter;

use crate::cli::{CliArgs, Command, FeedbackArgs, SearchArgs};
use crate::config::SiftConfig;
use crate::config_handlers;

// ============================================================================
// SiftCli
// ============================================================================

/// The CLI application over a loaded configuration.
pub struct SiftCli {
    config: SiftConfig,
    version: String,
}

impl SiftCli {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = SiftConfig::load(args.config.as_deref())?;
        Ok(Self::new(config))
    }

    /// Create over an already-loaded configuration.
    pub fn new(config: SiftConfig) -> Self {
        Self {
            config,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Initialise tracing-based logging.
    ///
    /// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
    pub fn init_logging(&self, verbose: bool, quiet: bool) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else if quiet {
            EnvFilter::new("warn")
        } else if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        };

        // Ignore error if a subscriber is already set (e.g. in tests).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }

    /// Run the CLI with the given arguments.
    pub async fn run(&self, args: CliArgs) -> Result<()> {
        self.init_logging(args.verbose, args.quiet);

        match args.command {
            Some(Command::Version) => {
                println!("{} {}", self.config.project_name(), self.version);
                Ok(())
            }
            Some(Command::Serve { host, port }) => self.serve(host, port).await,
            Some(Command::Search(search)) => self.search(search).await,
            Some(Command::Feedback(feedback)) => self.feedback(feedback).await,
            Some(Command::Analytics {
                days,
                top_n,
                recent,
            }) => self.analytics(days, top_n, recent).await,
            Some(Command::Health) => self.health().await,
            Some(Command::Config(config_cmd)) => {
                config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
            }
            None => {
                println!(
                    "{} {}: use --help for usage",
                    self.config.project_name(),
                    self.version
                );
                Ok(())
            }
        }
    }

    async fn serve(&self, host: Option<String>, port: Option<u16>) -> Result<()> {
        let mut config = self.config.clone();
        if let Some(host) = host {
            config.server.host = host;
        }
        if let Some(port) = port {
            config.server.port = port;
        }
        let addr = config.server_addr()?;

        let service = Arc::new(build_service(&config).await?);
        sift_api::serve(service, addr).await
    }

    async fn search(&self, args: SearchArgs) -> Result<()> {
        let service = build_service(&self.config).await?;

        let mut request = SearchRequest::new(args.query.join(" "));
        request.mode = args.mode;
        request.limit = args.limit;
        request.lexical_weight = args.lexical_weight;
        request.vector_weight = args.vector_weight;
        request.session_id = args.session;

        let result = service.search(request).await;
        service.shutdown().await;
        let response = result?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&response)?);
        } else {
            print!("{}", format_search(&response));
        }
        Ok(())
    }

    async fn feedback(&self, args: FeedbackArgs) -> Result<()> {
        let service = build_service(&self.config).await?;

        let mut request = FeedbackRequest::new(args.log_id, args.doc_id, args.rating);
        request.rank_position = args.rank;
        request.doc_title = args.title;
        request.mode = args.mode;
        request.query = args.query;
        request.session_id = args.session;

        let result = service.submit_feedback(request).await;
        service.shutdown().await;
        let response = result?;

        println!(
            "Recorded feedback {} for search {}",
            response.feedback_id, response.log_id
        );
        Ok(())
    }

    async fn analytics(
        &self,
        days: Option<i64>,
        top_n: Option<usize>,
        recent_k: Option<usize>,
    ) -> Result<()> {
        let defaults = &self.config.analytics;
        let window = Window::ending_now(days.unwrap_or(defaults.default_days))?;
        let store = EventStore::open(&self.config.database_url()?).await?;

        let result = Aggregator::new(&store)
            .report(
                &window,
                top_n.unwrap_or(defaults.top_n),
                recent_k.unwrap_or(defaults.recent_k),
            )
            .await;
        store.close().await;
        println!("{}", serde_json::to_string_pretty(&result?)?);
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let service = build_service(&self.config).await?;
        let report = service.health().await;
        service.shutdown().await;

        println!("{}", serde_json::to_string_pretty(&report)?);
        if report.is_healthy() {
            Ok(())
        } else {
            Err(Error::operation(format!(
                "{} is degraded",
                self.config.project_name()
            )))
        }
    }
}

// ============================================================================
// Service assembly
// ============================================================================

/// Build a search service from configuration.
///
/// # Errors
///
/// Fails if the corpus, dictionary, index, or event store cannot be opened,
/// or the configured embedding provider is unavailable.
pub async fn build_service(config: &SiftConfig) -> Result<SearchService> {
    let settings = config.search_settings();
    let documents = load_corpus(config)?;

    let mut combiner = HybridCombiner::new(lexical_backend(config, &documents)?);
    if config.vector.enabled {
        let embedder = create_embedding_provider(&config.vector)?;
        let texts: Vec<VectorDocument> = documents
            .iter()
            .map(|d| VectorDocument::new(d.id.clone(), d.embedding_text()))
            .collect();
        let backend = SimpleVectorBackend::build(embedder.as_ref(), &texts, config.vector.batch_size)
            .await?
            .with_min_similarity(config.vector.min_similarity);
        combiner = combiner.with_vector(embedder, Arc::new(backend));
    } else {
        log::info!("Vector retrieval disabled");
    }

    let mut normalizer = QueryNormalizer::new();
    if settings.spell_check {
        normalizer = normalizer.with_spell_corrector(spell_corrector(config, &documents)?);
    }

    let store = EventStore::open(&config.database_url()?).await?;

    Ok(SearchService::new(combiner, store)
        .await?
        .with_settings(settings)
        .with_normalizer(normalizer)
        .with_analytics_settings((&config.analytics).into())
        .with_titles(&documents))
}

/// Documents from `content.path`, or none when unset.
fn load_corpus(config: &SiftConfig) -> Result<Vec<LexicalDocument>> {
    match config.content_path() {
        Some(path) => load_jsonl(&path),
        None => {
            log::warn!("content.path is not set; searching an empty corpus");
            Ok(Vec::new())
        }
    }
}

fn lexical_backend(
    config: &SiftConfig,
    documents: &[LexicalDocument],
) -> Result<Arc<dyn LexicalBackend>> {
    match config.fts.backend.as_str() {
        "simple" => Ok(Arc::new(SimpleLexicalBackend::new(documents.to_vec()))),
        "tantivy" => tantivy_backend(config, documents),
        other => Err(Error::config(format!(
            "Unknown fts backend: '{other}'. Supported: simple, tantivy"
        ))),
    }
}

#[cfg(feature = "fts-tantivy")]
fn tantivy_backend(
    config: &SiftConfig,
    documents: &[LexicalDocument],
) -> Result<Arc<dyn LexicalBackend>> {
    let path = Path::new(config.fts.index_path.as_deref().unwrap_or("sift-index"));
    if !path.exists() {
        log::info!("Building lexical index at {}", path.display());
        sift_fts::build_index(path, documents)?;
    }
    Ok(Arc::new(sift_fts::TantivySearch::open(path)?))
}

#[cfg(not(feature = "fts-tantivy"))]
fn tantivy_backend(
    _config: &SiftConfig,
    _documents: &[LexicalDocument],
) -> Result<Arc<dyn LexicalBackend>> {
    Err(Error::config(
        "fts backend 'tantivy' requires the fts-tantivy feature",
    ))
}

/// Dictionary file if configured, else the corpus vocabulary.
fn spell_corrector(config: &SiftConfig, documents: &[LexicalDocument]) -> Result<SpellCorrector> {
    if let Some(path) = config.search.dictionary_path.as_deref() {
        return SpellCorrector::from_file(Path::new(path));
    }
    let corrector = SpellCorrector::from_words(corpus_vocabulary(documents));
    log::debug!("Spell corrector built from {} corpus terms", corrector.len());
    Ok(corrector)
}

fn corpus_vocabulary(documents: &[LexicalDocument]) -> HashMap<String, u32> {
    let mut counts = HashMap::new();
    for doc in documents {
        for (text, _) in doc.weighted_fields() {
            for token in tokenize(text) {
                *counts.entry(token).or_insert(0) += 1;
            }
        }
    }
    counts
}

// ============================================================================
// Output
// ============================================================================

/// Human-readable rendering of a search response.
pub fn format_search(response: &SearchResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "log id {}  mode {} (requested {})  {} of {} candidates",
        response.log_id,
        response.effective_mode,
        response.requested_mode,
        response.results.len(),
        response.total_candidates
    );
    if let Some(corrected) = &response.corrected_query {
        let _ = writeln!(out, "searched lexically for: {corrected}");
    }
    if response.degraded {
        let reason = response.degraded_reason.as_deref().unwrap_or("one source failed");
        let _ = writeln!(out, "degraded: {reason}");
    }
    if response.results.is_empty() {
        let _ = writeln!(out, "no results");
    }
    for hit in &response.results {
        let _ = writeln!(
            out,
            "{:>3}. {:<12} {:>8.4}  {}",
            hit.rank,
            hit.doc_id,
            hit.score,
            hit.title.as_deref().unwrap_or("")
        );
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

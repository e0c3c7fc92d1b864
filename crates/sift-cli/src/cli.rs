//! CLI argument parsing and command definitions.

use clap::{Args, Parser, Subcommand};

// ============================================================================
// CLI argument types
// ============================================================================

/// Hybrid lexical + vector search with feedback analytics.
#[derive(Parser, Debug)]
#[command(name = "sift", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long, env = "SIFT_CONFIG")]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP search API.
    Serve {
        /// Address to bind (overrides server.host).
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides server.port).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run one search and record it.
    Search(SearchArgs),

    /// Rate a document returned by an earlier search.
    Feedback(FeedbackArgs),

    /// Print the analytics report as JSON.
    Analytics {
        /// Window length in days (defaults to analytics.default_days).
        #[arg(short, long, allow_negative_numbers = true)]
        days: Option<i64>,

        /// Length of ranked lists.
        #[arg(long)]
        top_n: Option<usize>,

        /// Length of recent activity lists.
        #[arg(long)]
        recent: Option<usize>,
    },

    /// Check backends and event store.
    Health,

    /// Configuration operations.
    Config(ConfigCommand),

    /// Print version information.
    Version,
}

/// Arguments of `sift search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text.
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// lexical, vector or hybrid (aliases: bm25, semantic).
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Maximum number of results.
    #[arg(short, long, allow_negative_numbers = true)]
    pub limit: Option<i64>,

    /// Hybrid weight of the lexical source.
    #[arg(long)]
    pub lexical_weight: Option<f32>,

    /// Hybrid weight of the vector source.
    #[arg(long)]
    pub vector_weight: Option<f32>,

    /// Session identifier stored with the search.
    #[arg(long)]
    pub session: Option<String>,

    /// Print the full response as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `sift feedback`.
#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// Log id printed by `sift search`.
    #[arg(long)]
    pub log_id: i64,

    /// Rated document.
    #[arg(long)]
    pub doc_id: String,

    /// 1 (helpful) or -1 (not helpful).
    #[arg(long, allow_negative_numbers = true)]
    pub rating: i64,

    /// Rank at which the document was shown.
    #[arg(long, default_value_t = 1)]
    pub rank: i64,

    /// Document title (defaults to the corpus title).
    #[arg(long)]
    pub title: Option<String>,

    /// Mode of the rated search.
    #[arg(long)]
    pub mode: Option<String>,

    /// Query text of the rated search.
    #[arg(long)]
    pub query: Option<String>,

    /// Session identifier.
    #[arg(long)]
    pub session: Option<String>,
}

/// Config-specific subcommands.
#[derive(Parser, Debug)]
pub struct ConfigCommand {
    /// Config subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigAction,
}

/// Available config subcommands.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved config file path.
    Path,

    /// Print the resolved configuration as TOML.
    Show,

    /// Get a configuration value by dotted key (e.g. `search.default_mode`).
    Get {
        /// Dotted key path.
        key: String,
    },

    /// Create a default configuration file.
    Init {
        /// Output file path (defaults to XDG config path).
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite existing file.
        #[arg(long)]
        force: bool,
    },

    /// Export configuration as environment variables.
    Export {
        /// Format as Docker --env flags.
        #[arg(long)]
        docker_env: bool,
    },
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_default() {
        let args = CliArgs::parse_from(["sift"]);
        assert!(!args.verbose);
        assert!(!args.quiet);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_cli_args_global_flags() {
        let args = CliArgs::parse_from(["sift", "-v", "--config", "/tmp/sift.toml", "health"]);
        assert!(args.verbose);
        assert_eq!(args.config.as_deref(), Some("/tmp/sift.toml"));
        assert!(matches!(args.command, Some(Command::Health)));
    }

    #[test]
    fn test_serve_overrides() {
        let args = CliArgs::parse_from(["sift", "serve", "--port", "9090", "--host", "0.0.0.0"]);
        match args.command {
            Some(Command::Serve { host, port }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(9090));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_search_args() {
        let args = CliArgs::parse_from([
            "sift", "search", "election", "results", "--mode", "bm25", "--limit", "5",
            "--session", "s-1",
        ]);
        match args.command {
            Some(Command::Search(search)) => {
                assert_eq!(search.query.join(" "), "election results");
                assert_eq!(search.mode.as_deref(), Some("bm25"));
                assert_eq!(search.limit, Some(5));
                assert_eq!(search.session.as_deref(), Some("s-1"));
                assert!(!search.json);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_search_requires_query() {
        assert!(CliArgs::try_parse_from(["sift", "search"]).is_err());
    }

    #[test]
    fn test_feedback_negative_rating() {
        let args = CliArgs::parse_from([
            "sift", "feedback", "--log-id", "7", "--doc-id", "a1", "--rating", "-1",
        ]);
        match args.command {
            Some(Command::Feedback(feedback)) => {
                assert_eq!(feedback.log_id, 7);
                assert_eq!(feedback.rating, -1);
                assert_eq!(feedback.rank, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_analytics_days() {
        let args = CliArgs::parse_from(["sift", "analytics", "--days", "30"]);
        assert!(matches!(
            args.command,
            Some(Command::Analytics { days: Some(30), .. })
        ));
    }

    #[test]
    fn test_config_subcommands() {
        let args = CliArgs::parse_from(["sift", "config", "init", "--force"]);
        match args.command {
            Some(Command::Config(cmd)) => {
                assert!(matches!(cmd.command, ConfigAction::Init { force: true, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        let args = CliArgs::parse_from(["sift", "config", "get", "server.port"]);
        match args.command {
            Some(Command::Config(cmd)) => {
                assert!(matches!(cmd.command, ConfigAction::Get { ref key } if key == "server.port"));
            }
            other => panic!("unexpected {other:?}"),
        }
        let args = CliArgs::parse_from(["sift", "config", "show"]);
        assert!(matches!(
            args.command,
            Some(Command::Config(ConfigCommand {
                command: ConfigAction::Show
            }))
        ));
    }
}

//! Command-line interface and server binary for Sift.
//!
//! # Key Abstractions
//!
//! - [`SiftConfig`]: TOML + environment configuration, implementing
//!   [`ConfigProvider`](sift_core::traits::ConfigProvider)
//! - [`build_service`]: assembles a [`SearchService`](sift_api::SearchService)
//!   from configuration
//! - [`SiftCli`]: dispatches `serve`, `search`, `feedback`, `analytics`,
//!   `health`, `config` and `version`

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;

pub use app::{build_service, format_search, SiftCli};
pub use cli::{CliArgs, Command, ConfigAction, ConfigCommand, FeedbackArgs, SearchArgs};
pub use config::SiftConfig;

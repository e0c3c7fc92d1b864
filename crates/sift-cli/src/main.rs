//! `sift`: hybrid search service and analytics CLI.
//!
//! ```bash
//! sift serve --port 8000
//! sift search "election results" --mode hybrid
//! sift feedback --log-id 12 --doc-id a1 --rating 1
//! sift analytics --days 30
//! ```

use std::process::ExitCode;

use clap::Parser;
use sift_cli::{CliArgs, SiftCli};

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    let cli = match SiftCli::from_args(&args) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

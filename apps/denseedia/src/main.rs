//! # DenseEdia
//!
//! The main binary for the DenseEdia personal knowledge base.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/denseedia (THE BINARY)        │
//! │                                               │
//! │   ┌─────────────┐          ┌─────────────┐    │
//! │   │    CLI      │          │  HTTP API   │    │
//! │   │   (clap)    │          │   (axum)    │    │
//! │   └──────┬──────┘          └──────┬──────┘    │
//! │          └───────────┬────────────┘           │
//! │                      ▼                        │
//! │             ┌─────────────────┐               │
//! │             │ denseedia-core  │               │
//! │             │   (THE STORE)   │               │
//! │             └─────────────────┘               │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! denseedia add Dune -k book
//! denseedia set 1 rating 5 -t int
//! denseedia show 1
//! denseedia server --port 8080
//! ```

use clap::Parser;
use denseedia::cli;
use denseedia::config::LogFormat;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let config = cli.resolve_config();

    let log_format = config
        .as_ref()
        .map(|c| c.log_format)
        .unwrap_or_default();
    init_tracing(log_format, default_filter(cli.verbose, cli.is_server()));

    let result = match config {
        Ok(config) => cli::execute(cli, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!("Error: {}", e);
        if let Some(hint) = cli::hint(&e) {
            eprintln!("hint: {}", hint);
        }
        std::process::exit(1);
    }
}

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbose: u8, server: bool) -> &'static str {
    match (verbose, server) {
        (0, false) => "denseedia=warn",
        (0, true) | (1, _) => "denseedia=info,tower_http=info",
        _ => "denseedia=debug,tower_http=debug",
    }
}

/// Install the global subscriber. Logs go to stderr so `--json-mode`
/// output on stdout stays parseable.
fn init_tracing(format: LogFormat, default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

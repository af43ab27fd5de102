//! # tractflow - Batch Whole-Brain Tractography
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/tractflow (THE BINARY)            │
//! │                                                      │
//! │  ┌─────────────┐   ┌──────────────┐                  │
//! │  │   CLI       │   │ config.toml  │                  │
//! │  │  (clap)     │   │   (toml)     │                  │
//! │  └──────┬──────┘   └──────┬───────┘                  │
//! │         └────────┬────────┘                          │
//! │                  ▼                                   │
//! │          ┌────────────────┐      ┌───────────────┐   │
//! │          │ tractflow-core │ ───▶ │ MRtrix3 / ext │   │
//! │          │ (THE CONTROLLER)│     │  processes    │   │
//! │          └────────────────┘      └───────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Tractography for every sub-* directory under the root
//! tractflow --root /data/study run
//!
//! # Only two subjects, keep going if one fails
//! tractflow -r /data/study -s sub-01 -s sub-07 --continue-on-error run
//!
//! # Connectivity matrices, configured from a file
//! tractflow -c tractflow.toml connectivity
//!
//! # Which stages are already done
//! tractflow -r /data/study status
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tractflow::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // TRACTFLOW_LOG_FORMAT=json enables machine-parseable output. Logs go to
    // stderr so stdout stays clean for --json-mode.
    let log_format = std::env::var("TRACTFLOW_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("tractflow={0},tractflow_core={0}", default_level).into()
    });

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the tractflow startup banner.
fn print_banner() {
    println!(
        r#"
  tractflow v{}

  FA → responses → FODs → tractogram → trk
"#,
        env!("CARGO_PKG_VERSION")
    );
}

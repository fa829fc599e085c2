//! # Sphynx - Graph Entity Store
//!
//! The main binary for the Sphynx content-addressed entity store.
//!
//! This application provides:
//! - CLI interface over the entity store
//! - Plan execution (JSON lists of operation instances)
//! - Unordered staging import/export
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                apps/sphynx (THE BINARY)             │
//! │                                                     │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────┐  │
//! │  │    CLI      │   │   Config    │   │   Plans   │  │
//! │  │   (clap)    │   │   (toml)    │   │  (json)   │  │
//! │  └──────┬──────┘   └──────┬──────┘   └─────┬─────┘  │
//! │         └─────────────────┼────────────────┘        │
//! │                           ▼                         │
//! │                   ┌───────────────┐                 │
//! │                   │  sphynx-core  │                 │
//! │                   │  (THE LOGIC)  │                 │
//! │                   └───────────────┘                 │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! sphynx init
//! sphynx run --plan plan.json
//! sphynx show <guid> --limit 10
//! sphynx status --json-mode
//! ```

use clap::Parser;
use sphynx::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Initialize tracing. SPHYNX_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SPHYNX_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sphynx=info,sphynx_core=info".into());

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

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(if e.is_retryable() { 75 } else { 1 });
    }
}

//! This file defines the tabstore server binary entry point.

use tabstore::app;
use tabstore::app_state::AppState;
use tabstore::cli;
use tabstore::metrics;
use tabstore::server;
use tabstore::tracing;

use std::process::exit;
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing();
    metrics::register_metrics();
    let state = match AppState::new(&args) {
        Ok(state) => Arc::new(state),
        Err(err) => {
            eprintln!("Failed to initialise dataset storage: {}", err);
            exit(1)
        }
    };
    let service = app::service(state);
    if let Err(err) = server::serve(&args, service).await {
        eprintln!("Server error: {}", err);
        exit(1)
    }
}

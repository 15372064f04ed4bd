//! Command line client for the tabstore server.

use clap::Parser;
use std::process::exit;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tabstore::client::{self, Cli};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("Failed to start runtime: {}", err);
            exit(1)
        }
    };

    if let Err(err) = runtime.block_on(client::execute(cli)) {
        tracing::error!("Error: {:#}", err);
        exit(1)
    }
}

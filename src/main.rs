//! Newsdesk - news article ingestion, curation and publishing pipeline.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsdesk::cli;
use newsdesk::control::{LogHub, LogLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = if cli::is_verbose() {
        "newsdesk=debug"
    } else {
        "newsdesk=info"
    };

    // The hub exists before tracing is initialized so the control server
    // can replay everything logged since startup.
    let logs = LogHub::new();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(LogLayer::new(logs.clone()))
        .init();

    cli::run(logs).await
}

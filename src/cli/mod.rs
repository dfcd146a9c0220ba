//! CLI parser and command dispatch.

mod pipeline_cmd;
mod serve;
mod source;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::control::LogHub;
use crate::repository::DbContext;

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(about = "News article ingestion, curation and publishing pipeline")]
#[command(version)]
pub struct Cli {
    /// Settings file path
    #[arg(short, long, global = true, default_value = "newsdesk.toml")]
    config: PathBuf,

    /// Database file path (overrides the settings file)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and schema
    Init,

    /// Run the scheduler and the control server
    Serve,

    /// Run one scrape cycle
    Scrape {
        /// Source ids to scrape (all active sources when empty)
        source_ids: Vec<String>,
        /// Number of scrape workers
        #[arg(short, long, default_value = "5")]
        workers: usize,
    },

    /// Run one enrichment pass over scraped items
    Enrich {
        /// Maximum items to enrich
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Run the quality gate over enriched items
    Prepare,

    /// Publish delay-elapsed items from auto-publish sources
    Publish {
        /// Maximum items to publish
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Pick and publish a diversity-balanced batch from the queue
    Curate {
        /// Show the selection without publishing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show pipeline counts and source health
    Status,

    /// Manage scraping sources
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },
}

#[derive(Subcommand)]
enum SourceCommands {
    /// List configured sources
    List,

    /// Add a source
    Add {
        /// Stable key items refer to
        slug: String,
        /// Display name
        name: String,
        /// Listing page base URL
        base_url: String,
        /// Section path under the base URL (repeatable)
        #[arg(short, long = "section")]
        sections: Vec<String>,
        /// CSS selector for article links on listing pages
        #[arg(long)]
        link_selector: Option<String>,
        /// CSS selector for article body paragraphs
        #[arg(long)]
        content_selector: Option<String>,
        /// Maximum articles harvested per run
        #[arg(long, default_value = "50")]
        max_items: i64,
        /// Publish enriched items from this source automatically
        #[arg(long)]
        auto_publish: bool,
        /// Cooling-off minutes before an automatic publish
        #[arg(long, default_value = "15")]
        auto_publish_delay: i64,
    },

    /// Activate a source
    Enable {
        slug: String,
    },

    /// Deactivate a source
    Disable {
        slug: String,
    },

    /// Send a discarded item back to the start of the pipeline
    RestoreItem {
        item_id: String,
    },
}

/// Run the CLI.
pub async fn run(logs: Arc<LogHub>) -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    match cli.command {
        Commands::Init => {
            let ctx = DbContext::open(&settings.db_path)?;
            println!("Initialized database at {}", ctx.db_path().display());
            Ok(())
        }
        Commands::Serve => serve::cmd_serve(&settings, logs).await,
        Commands::Scrape {
            source_ids,
            workers,
        } => pipeline_cmd::cmd_scrape(&settings, source_ids, workers).await,
        Commands::Enrich { limit } => pipeline_cmd::cmd_enrich(&settings, limit).await,
        Commands::Prepare => pipeline_cmd::cmd_prepare(&settings),
        Commands::Publish { limit } => pipeline_cmd::cmd_publish(&settings, limit),
        Commands::Curate { dry_run } => pipeline_cmd::cmd_curate(&settings, dry_run),
        Commands::Status => status::cmd_status(&settings),
        Commands::Source { command } => match command {
            SourceCommands::List => source::cmd_source_list(&settings),
            SourceCommands::Add {
                slug,
                name,
                base_url,
                sections,
                link_selector,
                content_selector,
                max_items,
                auto_publish,
                auto_publish_delay,
            } => source::cmd_source_add(
                &settings,
                slug,
                name,
                base_url,
                sections,
                link_selector,
                content_selector,
                max_items,
                auto_publish,
                auto_publish_delay,
            ),
            SourceCommands::Enable { slug } => source::cmd_source_set_active(&settings, &slug, true),
            SourceCommands::Disable { slug } => {
                source::cmd_source_set_active(&settings, &slug, false)
            }
            SourceCommands::RestoreItem { item_id } => source::cmd_restore_item(&settings, &item_id),
        },
    }
}

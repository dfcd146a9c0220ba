//! Scraper implementations for news article sources.

pub mod cycle;
pub mod http_list;
pub mod ingest;

pub use cycle::{run_cycle, CycleOutcome};
pub use http_list::HttpListScraper;
pub use ingest::{IngestStats, Ingestor};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::ScrapingSource;

/// An article pulled off a source page, before persistence.
#[derive(Debug, Clone, Default)]
pub struct RawArticle {
    pub url: String,
    pub section: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub summary: Option<String>,
    pub content: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

/// A strategy for harvesting articles from one source.
#[async_trait]
pub trait SourceScraper: Send + Sync {
    /// Scraper name recorded on every item it produces.
    fn name(&self) -> &str;

    /// Harvest up to `source.max_items_per_run` articles.
    async fn scrape(&self, source: &ScrapingSource) -> anyhow::Result<Vec<RawArticle>>;
}

/// Build the scraper registered under `kind`, if any.
pub fn scraper_for(kind: &str) -> Option<Box<dyn SourceScraper>> {
    match kind {
        "http_list" => Some(Box::new(HttpListScraper::new())),
        _ => None,
    }
}

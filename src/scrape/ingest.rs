//! Persistence of scraped articles: the single entry point into the
//! pipeline's working set.

use std::sync::Arc;

use tracing::debug;

use super::RawArticle;
use crate::models::{ScrapingItem, ScrapingSource};
use crate::repository::{DbContext, IngestOutcome, Result};

/// Counters for one ingest batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub new_items: usize,
    pub refreshed: usize,
}

/// Turns raw scraped articles into stored items.
pub struct Ingestor {
    db: Arc<DbContext>,
}

impl Ingestor {
    pub fn new(db: Arc<DbContext>) -> Self {
        Self { db }
    }

    /// Persist one raw article for `source`.
    ///
    /// A URL seen for the first time creates a new item in `scraped`;
    /// a known URL refreshes content on the existing row without touching
    /// its lifecycle.
    pub fn ingest(
        &self,
        source: &ScrapingSource,
        scraper_name: &str,
        run_id: &str,
        raw: RawArticle,
    ) -> Result<IngestOutcome> {
        let mut item = ScrapingItem::new(
            source.slug.clone(),
            scraper_name.to_string(),
            raw.url,
            raw.content,
        );
        item.section = raw.section;
        item.title = raw.title;
        item.subtitle = raw.subtitle;
        item.summary = raw.summary;
        item.author = raw.author;
        item.published_at = raw.published_at;
        item.tags = raw.tags;
        item.image_urls = raw.image_urls;
        item.video_urls = raw.video_urls;
        item.run_id = Some(run_id.to_string());

        let outcome = self.db.items.upsert_scraped(&item)?;
        debug!(
            url = %item.url,
            new = outcome.is_new(),
            "ingested article"
        );
        Ok(outcome)
    }

    /// Persist a whole batch, tallying outcomes.
    pub fn ingest_batch(
        &self,
        source: &ScrapingSource,
        scraper_name: &str,
        run_id: &str,
        batch: Vec<RawArticle>,
    ) -> Result<IngestStats> {
        let mut stats = IngestStats::default();
        for raw in batch {
            match self.ingest(source, scraper_name, run_id, raw)? {
                IngestOutcome::Inserted(_) => stats.new_items += 1,
                IngestOutcome::Refreshed(_) => stats.refreshed += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<DbContext>, Ingestor) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbContext::open(&dir.path().join("test.db")).unwrap());
        let ingestor = Ingestor::new(db.clone());
        (dir, db, ingestor)
    }

    fn raw(url: &str) -> RawArticle {
        RawArticle {
            url: url.into(),
            title: Some("Titular".into()),
            content: "Texto del artículo.".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_counts_new_and_refreshed() {
        let (_dir, _db, ingestor) = setup();
        let source = ScrapingSource::new(
            "lagaceta".into(),
            "La Gaceta".into(),
            "https://lagaceta.example".into(),
        );

        let stats = ingestor
            .ingest_batch(
                &source,
                "http_list",
                "run-1",
                vec![
                    raw("https://lagaceta.example/a"),
                    raw("https://lagaceta.example/b"),
                    // Tracking variant of the first URL.
                    raw("https://lagaceta.example/a?utm_source=rss"),
                ],
            )
            .unwrap();

        assert_eq!(stats.new_items, 2);
        assert_eq!(stats.refreshed, 1);
    }
}

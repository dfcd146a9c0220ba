//! AI enrichment: rewriting raw scraped articles into publishable copy.

pub mod chat;

pub use chat::{ChatConfig, ChatEnricher};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{EnrichmentOutput, ItemStatus, ScrapingItem};
use crate::repository::DbContext;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Produces enrichment output for one item.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, item: &ScrapingItem) -> Result<EnrichmentOutput, EnrichError>;
}

/// Counters for one enrichment pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    /// Items newly queued from `scraped`.
    pub queued: usize,
    pub enriched: usize,
    pub failed: usize,
}

/// Run one enrichment pass.
///
/// Queues recently scraped items, then works through the queue one item
/// at a time: `ready_for_ai → processing_ai → ai_completed`, or back to
/// `error` with a bumped retry counter. Items that exhausted their
/// retries are left alone.
pub async fn run_pass(
    db: Arc<DbContext>,
    enricher: &dyn Enricher,
    lookback_hours: i64,
    batch_limit: usize,
) -> crate::repository::Result<PassStats> {
    let mut stats = PassStats {
        queued: db.items.mark_ready_for_ai(lookback_hours)?,
        ..Default::default()
    };

    let queue = db.items.enrichment_queue(batch_limit)?;
    if queue.is_empty() {
        return Ok(stats);
    }
    info!(queued = stats.queued, pending = queue.len(), "enrichment pass started");

    for item in queue {
        db.items
            .set_status(&item.id, ItemStatus::ProcessingAi, None)?;

        match enricher.enrich(&item).await {
            Ok(output) => {
                db.items.apply_enrichment(&item.id, &output)?;
                stats.enriched += 1;
            }
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "enrichment failed");
                db.items.record_error(&item.id, &e.to_string())?;
                stats.failed += 1;
            }
        }
    }

    info!(
        enriched = stats.enriched,
        failed = stats.failed,
        "enrichment pass finished"
    );
    Ok(stats)
}

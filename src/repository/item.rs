//! Item repository: the pipeline's working set.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, Row};

use super::{parse_datetime, parse_datetime_opt, RepositoryError, Result};
use crate::models::{EnrichmentOutput, ItemStatus, ScrapingItem};

/// What an ingest did with an incoming item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// First sighting of this URL; a new row was created.
    Inserted(String),
    /// The URL was already known; content fields were refreshed in place.
    Refreshed(String),
}

impl IngestOutcome {
    pub fn item_id(&self) -> &str {
        match self {
            Self::Inserted(id) | Self::Refreshed(id) => id,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// SQLite-backed repository for scraping items.
#[derive(Debug)]
pub struct ItemRepository {
    db_path: PathBuf,
}

impl ItemRepository {
    /// Create a new item repository.
    pub fn new(db_path: &Path) -> Result<Self> {
        let repo = Self {
            db_path: db_path.to_path_buf(),
        };
        repo.init_schema()?;
        Ok(repo)
    }

    fn connect(&self) -> Result<Connection> {
        super::connect(&self.db_path)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                source_key TEXT NOT NULL,
                section TEXT,
                url TEXT NOT NULL,
                normalized_url TEXT NOT NULL,
                url_fingerprint TEXT NOT NULL UNIQUE,
                content_fingerprint TEXT NOT NULL,

                title TEXT,
                subtitle TEXT,
                summary TEXT,
                content TEXT NOT NULL,
                author TEXT,
                published_at TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                image_urls TEXT NOT NULL DEFAULT '[]',
                video_urls TEXT NOT NULL DEFAULT '[]',

                scraper_name TEXT NOT NULL,
                run_id TEXT,
                scraped_at TEXT NOT NULL,

                enrichment TEXT,
                enriched_at TEXT,

                status TEXT NOT NULL DEFAULT 'scraped',
                status_message TEXT,
                status_updated_at TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                last_error TEXT,
                last_error_at TEXT,

                article_id TEXT,
                article_published_at TEXT,

                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_items_status ON items(status);
            CREATE INDEX IF NOT EXISTS idx_items_source_key ON items(source_key);
            CREATE INDEX IF NOT EXISTS idx_items_scraped_at ON items(scraped_at);
        "#,
        )?;
        Ok(())
    }

    /// Insert a freshly scraped item, or refresh the existing row when the
    /// normalized URL was seen before.
    ///
    /// On refresh the row keeps its `id`, `scraped_at`, lifecycle columns
    /// and any enrichment; only raw content fields are overwritten.
    pub fn upsert_scraped(&self, item: &ScrapingItem) -> Result<IngestOutcome> {
        let conn = self.connect()?;

        conn.execute(
            r#"
            INSERT INTO items (
                id, source_key, section, url, normalized_url,
                url_fingerprint, content_fingerprint,
                title, subtitle, summary, content, author, published_at,
                tags, image_urls, video_urls,
                scraper_name, run_id, scraped_at,
                status, status_message, status_updated_at,
                retry_count, max_retries, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25)
            ON CONFLICT(url_fingerprint) DO UPDATE SET
                section = excluded.section,
                url = excluded.url,
                normalized_url = excluded.normalized_url,
                content_fingerprint = excluded.content_fingerprint,
                title = excluded.title,
                subtitle = excluded.subtitle,
                summary = excluded.summary,
                content = excluded.content,
                author = excluded.author,
                published_at = excluded.published_at,
                tags = excluded.tags,
                image_urls = excluded.image_urls,
                video_urls = excluded.video_urls,
                scraper_name = excluded.scraper_name,
                run_id = excluded.run_id,
                updated_at = excluded.updated_at
            "#,
            params![
                item.id,
                item.source_key,
                item.section,
                item.url,
                item.normalized_url,
                item.url_fingerprint,
                item.content_fingerprint,
                item.title,
                item.subtitle,
                item.summary,
                item.content,
                item.author,
                item.published_at.map(|dt| dt.to_rfc3339()),
                serde_json::to_string(&item.tags)?,
                serde_json::to_string(&item.image_urls)?,
                serde_json::to_string(&item.video_urls)?,
                item.scraper_name,
                item.run_id,
                item.scraped_at.to_rfc3339(),
                item.status.as_str(),
                item.status_message,
                item.status_updated_at.to_rfc3339(),
                item.retry_count,
                item.max_retries,
                item.updated_at.to_rfc3339(),
            ],
        )?;

        // The row keeps its original id on conflict, so comparing ids tells
        // us whether the insert or the update branch ran.
        let stored_id: String = conn.query_row(
            "SELECT id FROM items WHERE url_fingerprint = ?1",
            params![item.url_fingerprint],
            |row| row.get(0),
        )?;

        if stored_id == item.id {
            Ok(IngestOutcome::Inserted(stored_id))
        } else {
            Ok(IngestOutcome::Refreshed(stored_id))
        }
    }

    /// Get an item by ID.
    pub fn get(&self, id: &str) -> Result<Option<ScrapingItem>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM items WHERE id = ?1")?;
        super::to_option(stmt.query_row(params![id], row_to_item))
    }

    /// Get items in a given status, oldest first.
    pub fn get_by_status(&self, status: ItemStatus, limit: Option<usize>) -> Result<Vec<ScrapingItem>> {
        let conn = self.connect()?;
        let limit = limit.map(|n| n as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            "SELECT * FROM items WHERE status = ?1 ORDER BY scraped_at ASC LIMIT ?2",
        )?;
        let items = stmt
            .query_map(params![status.as_str(), limit], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Items waiting for enrichment: queued items plus retryable failures.
    pub fn enrichment_queue(&self, limit: usize) -> Result<Vec<ScrapingItem>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM items
            WHERE status IN ('ready_for_ai', 'error') AND retry_count < max_retries
            ORDER BY scraped_at ASC
            LIMIT ?1
            "#,
        )?;
        let items = stmt
            .query_map(params![limit as i64], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Item counts per status.
    pub fn counts_by_status(&self) -> Result<Vec<(String, i64)>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM items GROUP BY status ORDER BY status")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }

    /// Move an item to `next`, enforcing the lifecycle state machine.
    pub fn set_status(&self, id: &str, next: ItemStatus, message: Option<&str>) -> Result<()> {
        let item = self
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("item {id}")))?;

        if !item.status.can_transition(next) {
            return Err(RepositoryError::IllegalTransition {
                item_id: id.to_string(),
                from: item.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE items
            SET status = ?1, status_message = ?2, status_updated_at = ?3, updated_at = ?3
            WHERE id = ?4
            "#,
            params![next.as_str(), message, now, id],
        )?;
        Ok(())
    }

    /// Queue recently scraped items for enrichment. Returns how many moved.
    pub fn mark_ready_for_ai(&self, lookback_hours: i64) -> Result<usize> {
        let conn = self.connect()?;
        let cutoff = (Utc::now() - Duration::hours(lookback_hours)).to_rfc3339();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            r#"
            UPDATE items
            SET status = 'ready_for_ai', status_message = NULL,
                status_updated_at = ?1, updated_at = ?1
            WHERE status = 'scraped' AND scraped_at >= ?2
            "#,
            params![now, cutoff],
        )?;
        Ok(changed)
    }

    /// Record a stage failure: bump the retry counter and remember the error.
    ///
    /// The item moves to `error` only when its current status allows it;
    /// otherwise the status stays put and only the error fields change.
    pub fn record_error(&self, id: &str, error: &str) -> Result<()> {
        let item = self
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("item {id}")))?;

        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();

        if item.status.can_transition(ItemStatus::Error) {
            conn.execute(
                r#"
                UPDATE items
                SET status = 'error', status_message = ?1, status_updated_at = ?2,
                    retry_count = retry_count + 1, last_error = ?1, last_error_at = ?2,
                    updated_at = ?2
                WHERE id = ?3
                "#,
                params![error, now, id],
            )?;
        } else {
            conn.execute(
                r#"
                UPDATE items
                SET retry_count = retry_count + 1, last_error = ?1, last_error_at = ?2,
                    updated_at = ?2
                WHERE id = ?3
                "#,
                params![error, now, id],
            )?;
        }
        Ok(())
    }

    /// Store enrichment output and advance the item to `ai_completed`.
    pub fn apply_enrichment(&self, id: &str, output: &EnrichmentOutput) -> Result<()> {
        let item = self
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("item {id}")))?;

        if !item.status.can_transition(ItemStatus::AiCompleted) {
            return Err(RepositoryError::IllegalTransition {
                item_id: id.to_string(),
                from: item.status.as_str().to_string(),
                to: ItemStatus::AiCompleted.as_str().to_string(),
            });
        }

        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE items
            SET enrichment = ?1, enriched_at = ?2,
                status = 'ai_completed', status_message = NULL,
                status_updated_at = ?2, updated_at = ?2
            WHERE id = ?3
            "#,
            params![serde_json::to_string(output)?, now, id],
        )?;
        Ok(())
    }

    /// Link an item to its published article and mark it `published`.
    pub fn mark_published(&self, id: &str, article_id: &str) -> Result<()> {
        let item = self
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("item {id}")))?;

        if !item.status.can_transition(ItemStatus::Published) {
            return Err(RepositoryError::IllegalTransition {
                item_id: id.to_string(),
                from: item.status.as_str().to_string(),
                to: ItemStatus::Published.as_str().to_string(),
            });
        }

        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE items
            SET status = 'published', status_message = NULL, status_updated_at = ?1,
                article_id = ?2, article_published_at = ?1, updated_at = ?1
            WHERE id = ?3
            "#,
            params![now, article_id, id],
        )?;
        Ok(())
    }

    /// Expire publish-ready items that sat unpublished too long.
    pub fn expire_ready(&self, max_age_hours: i64) -> Result<usize> {
        let conn = self.connect()?;
        let cutoff = (Utc::now() - Duration::hours(max_age_hours)).to_rfc3339();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            r#"
            UPDATE items
            SET status = 'expired',
                status_message = 'Expired: not published within ' || ?1 || 'h',
                status_updated_at = ?2, updated_at = ?2
            WHERE status = 'ready_to_publish' AND status_updated_at < ?3
            "#,
            params![max_age_hours, now, cutoff],
        )?;
        Ok(changed)
    }

    /// Discard enriched items the curator never picked up.
    pub fn discard_stale_completed(&self, max_age_hours: i64) -> Result<usize> {
        let conn = self.connect()?;
        let cutoff = (Utc::now() - Duration::hours(max_age_hours)).to_rfc3339();
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            r#"
            UPDATE items
            SET status = 'discarded',
                status_message = 'Discarded: not selected within ' || ?1 || 'h of enrichment',
                status_updated_at = ?2, updated_at = ?2
            WHERE status = 'ai_completed'
              AND COALESCE(enriched_at, status_updated_at) < ?3
            "#,
            params![max_age_hours, now, cutoff],
        )?;
        Ok(changed)
    }

    /// Send a discarded item back to the start of the pipeline.
    pub fn restore_discarded(&self, id: &str) -> Result<()> {
        let item = self
            .get(id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("item {id}")))?;

        if !item.status.can_transition(ItemStatus::Scraped) {
            return Err(RepositoryError::IllegalTransition {
                item_id: id.to_string(),
                from: item.status.as_str().to_string(),
                to: ItemStatus::Scraped.as_str().to_string(),
            });
        }

        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE items
            SET status = 'scraped', status_message = 'Restored from discarded',
                status_updated_at = ?1, retry_count = 0,
                enrichment = NULL, enriched_at = NULL, updated_at = ?1
            WHERE id = ?2
            "#,
            params![now, id],
        )?;
        Ok(())
    }

    /// Display titles of items already queued for publication, for
    /// duplicate screening against new candidates.
    pub fn queued_titles(&self, exclude_id: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM items WHERE status = 'ready_to_publish' AND id != ?1")?;
        let titles = stmt
            .query_map(params![exclude_id], row_to_item)?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|item| item.display_title().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(titles)
    }

    /// Publish-ready items from auto-publish sources whose cooling-off
    /// delay has elapsed.
    pub fn ready_for_auto_publish(&self, limit: usize) -> Result<Vec<ScrapingItem>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT i.*, s.auto_publish_delay_minutes AS delay_minutes
            FROM items i
            JOIN sources s ON s.slug = i.source_key
            WHERE i.status = 'ready_to_publish'
              AND s.is_active = 1
              AND s.auto_publish = 1
            ORDER BY i.status_updated_at ASC
            "#,
        )?;
        let candidates = stmt
            .query_map([], |row| {
                let delay: i64 = row.get("delay_minutes")?;
                Ok((row_to_item(row)?, delay))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let now = Utc::now();
        let due = candidates
            .into_iter()
            .filter(|(item, delay)| now - item.status_updated_at >= Duration::minutes(*delay))
            .map(|(item, _)| item)
            .take(limit)
            .collect();
        Ok(due)
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<ScrapingItem> {
    let enrichment: Option<EnrichmentOutput> = row
        .get::<_, Option<String>>("enrichment")?
        .and_then(|raw| serde_json::from_str(&raw).ok());

    Ok(ScrapingItem {
        id: row.get("id")?,
        source_key: row.get("source_key")?,
        section: row.get("section")?,
        url: row.get("url")?,
        normalized_url: row.get("normalized_url")?,
        url_fingerprint: row.get("url_fingerprint")?,
        content_fingerprint: row.get("content_fingerprint")?,
        title: row.get("title")?,
        subtitle: row.get("subtitle")?,
        summary: row.get("summary")?,
        content: row.get("content")?,
        author: row.get("author")?,
        published_at: parse_datetime_opt(row.get("published_at")?),
        tags: serde_json::from_str(&row.get::<_, String>("tags")?).unwrap_or_default(),
        image_urls: serde_json::from_str(&row.get::<_, String>("image_urls")?).unwrap_or_default(),
        video_urls: serde_json::from_str(&row.get::<_, String>("video_urls")?).unwrap_or_default(),
        scraper_name: row.get("scraper_name")?,
        run_id: row.get("run_id")?,
        scraped_at: parse_datetime(&row.get::<_, String>("scraped_at")?),
        enrichment,
        enriched_at: parse_datetime_opt(row.get("enriched_at")?),
        status: ItemStatus::from_str(&row.get::<_, String>("status")?)
            .unwrap_or(ItemStatus::Error),
        status_message: row.get("status_message")?,
        status_updated_at: parse_datetime(&row.get::<_, String>("status_updated_at")?),
        retry_count: row.get("retry_count")?,
        max_retries: row.get("max_retries")?,
        last_error: row.get("last_error")?,
        last_error_at: parse_datetime_opt(row.get("last_error_at")?),
        article_id: row.get("article_id")?,
        article_published_at: parse_datetime_opt(row.get("article_published_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, ItemRepository) {
        let dir = TempDir::new().unwrap();
        let repo = ItemRepository::new(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    fn sample(url: &str) -> ScrapingItem {
        let mut item = ScrapingItem::new(
            "lagaceta".into(),
            "http_list".into(),
            url.into(),
            "Cuerpo de prueba con suficiente texto.".into(),
        );
        item.title = Some("Titular de prueba".into());
        item
    }

    fn enriched() -> EnrichmentOutput {
        EnrichmentOutput {
            title: "Titular mejorado".into(),
            summary: "Resumen".into(),
            category: "Política".into(),
            tags: vec!["senado".into()],
            renderings: Default::default(),
            is_valid: true,
            rejection_reason: None,
            extra: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_upsert_insert_then_refresh() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/nota?utm_source=tw");
        let outcome = repo.upsert_scraped(&item).unwrap();
        assert!(outcome.is_new());

        // Same article reached without the tracking parameter.
        let mut again = sample("https://example.com/nota");
        again.title = Some("Titular actualizado".into());
        let outcome = repo.upsert_scraped(&again).unwrap();
        assert!(!outcome.is_new());
        assert_eq!(outcome.item_id(), item.id);

        let stored = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Titular actualizado"));
        assert_eq!(stored.status, ItemStatus::Scraped);
    }

    #[test]
    fn test_refresh_preserves_lifecycle() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/a");
        repo.upsert_scraped(&item).unwrap();
        repo.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();

        repo.upsert_scraped(&sample("https://example.com/a")).unwrap();
        let stored = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::ReadyForAi);
    }

    #[test]
    fn test_set_status_rejects_illegal_transition() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/b");
        repo.upsert_scraped(&item).unwrap();

        let err = repo
            .set_status(&item.id, ItemStatus::Published, None)
            .unwrap_err();
        assert!(matches!(err, RepositoryError::IllegalTransition { .. }));
    }

    #[test]
    fn test_enrichment_flow() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/c");
        repo.upsert_scraped(&item).unwrap();
        repo.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();
        repo.set_status(&item.id, ItemStatus::ProcessingAi, None).unwrap();
        repo.apply_enrichment(&item.id, &enriched()).unwrap();

        let stored = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::AiCompleted);
        assert_eq!(stored.display_title(), "Titular mejorado");
        assert!(stored.enriched_at.is_some());
    }

    #[test]
    fn test_record_error_and_retry_queue() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/d");
        repo.upsert_scraped(&item).unwrap();
        repo.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();

        repo.record_error(&item.id, "model timeout").unwrap();
        let stored = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::Error);
        assert_eq!(stored.retry_count, 1);

        // Still retryable, so it stays in the queue.
        let queue = repo.enrichment_queue(10).unwrap();
        assert_eq!(queue.len(), 1);

        repo.record_error(&item.id, "model timeout").unwrap();
        repo.record_error(&item.id, "model timeout").unwrap();
        let queue = repo.enrichment_queue(10).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mark_ready_for_ai_respects_lookback() {
        let (_dir, repo) = repo();
        let mut old = sample("https://example.com/old");
        old.scraped_at = Utc::now() - Duration::hours(48);
        repo.upsert_scraped(&old).unwrap();
        repo.upsert_scraped(&sample("https://example.com/new")).unwrap();

        let moved = repo.mark_ready_for_ai(24).unwrap();
        assert_eq!(moved, 1);
        assert_eq!(
            repo.get(&old.id).unwrap().unwrap().status,
            ItemStatus::Scraped
        );
    }

    #[test]
    fn test_restore_discarded_resets_enrichment() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/e");
        repo.upsert_scraped(&item).unwrap();
        repo.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();
        repo.set_status(&item.id, ItemStatus::ProcessingAi, None).unwrap();
        repo.apply_enrichment(&item.id, &enriched()).unwrap();
        repo.set_status(&item.id, ItemStatus::Discarded, Some("rechazada")).unwrap();

        repo.restore_discarded(&item.id).unwrap();
        let stored = repo.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::Scraped);
        assert!(stored.enrichment.is_none());
        assert_eq!(stored.retry_count, 0);
    }

    #[test]
    fn test_expiry_sweeps() {
        let (_dir, repo) = repo();
        let item = sample("https://example.com/f");
        repo.upsert_scraped(&item).unwrap();
        repo.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();
        repo.set_status(&item.id, ItemStatus::ProcessingAi, None).unwrap();
        repo.apply_enrichment(&item.id, &enriched()).unwrap();
        repo.set_status(&item.id, ItemStatus::ReadyToPublish, None).unwrap();

        // Fresh: nothing expires.
        assert_eq!(repo.expire_ready(12).unwrap(), 0);
        // Zero-hour cutoff: anything ready expires.
        assert_eq!(repo.expire_ready(-1).unwrap(), 1);
        assert_eq!(
            repo.get(&item.id).unwrap().unwrap().status,
            ItemStatus::Expired
        );
    }

    #[test]
    fn test_counts_by_status() {
        let (_dir, repo) = repo();
        repo.upsert_scraped(&sample("https://example.com/g")).unwrap();
        repo.upsert_scraped(&sample("https://example.com/h")).unwrap();
        let counts = repo.counts_by_status().unwrap();
        assert_eq!(counts, vec![("scraped".to_string(), 2)]);
    }
}

//! Source repository: configured origins and their health.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::{parse_datetime, parse_datetime_opt, Result};
use crate::models::ScrapingSource;

/// SQLite-backed repository for scraping sources.
#[derive(Debug)]
pub struct SourceRepository {
    db_path: PathBuf,
}

impl SourceRepository {
    /// Create a new source repository.
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
            CREATE TABLE IF NOT EXISTS sources (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                base_url TEXT NOT NULL,
                sections TEXT NOT NULL DEFAULT '[]',
                scraper_kind TEXT NOT NULL DEFAULT 'http_list',
                is_active INTEGER NOT NULL DEFAULT 0,
                interval_minutes INTEGER NOT NULL DEFAULT 60,
                max_items_per_run INTEGER NOT NULL DEFAULT 50,
                auto_publish INTEGER NOT NULL DEFAULT 0,
                auto_publish_delay_minutes INTEGER NOT NULL DEFAULT 15,
                consecutive_errors INTEGER NOT NULL DEFAULT 0,
                max_consecutive_errors INTEGER NOT NULL DEFAULT 5,
                last_run_at TEXT,
                last_run_status TEXT,
                last_run_message TEXT,
                last_run_items INTEGER NOT NULL DEFAULT 0,
                total_items INTEGER NOT NULL DEFAULT 0,
                total_runs INTEGER NOT NULL DEFAULT 0,
                config TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Get a source by ID.
    pub fn get(&self, id: &str) -> Result<Option<ScrapingSource>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM sources WHERE id = ?1")?;
        super::to_option(stmt.query_row(params![id], row_to_source))
    }

    /// Get a source by its stable slug.
    pub fn get_by_slug(&self, slug: &str) -> Result<Option<ScrapingSource>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM sources WHERE slug = ?1")?;
        super::to_option(stmt.query_row(params![slug], row_to_source))
    }

    /// Get all sources.
    pub fn get_all(&self) -> Result<Vec<ScrapingSource>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM sources ORDER BY name")?;
        let sources = stmt
            .query_map([], row_to_source)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    /// Get active sources only.
    pub fn get_active(&self) -> Result<Vec<ScrapingSource>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM sources WHERE is_active = 1 ORDER BY name")?;
        let sources = stmt
            .query_map([], row_to_source)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    /// Save a source (insert or update by ID).
    pub fn save(&self, source: &ScrapingSource) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO sources (
                id, slug, name, base_url, sections, scraper_kind, is_active,
                interval_minutes, max_items_per_run,
                auto_publish, auto_publish_delay_minutes,
                consecutive_errors, max_consecutive_errors,
                last_run_at, last_run_status, last_run_message, last_run_items,
                total_items, total_runs, config, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                    ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
            ON CONFLICT(id) DO UPDATE SET
                slug = excluded.slug,
                name = excluded.name,
                base_url = excluded.base_url,
                sections = excluded.sections,
                scraper_kind = excluded.scraper_kind,
                is_active = excluded.is_active,
                interval_minutes = excluded.interval_minutes,
                max_items_per_run = excluded.max_items_per_run,
                auto_publish = excluded.auto_publish,
                auto_publish_delay_minutes = excluded.auto_publish_delay_minutes,
                max_consecutive_errors = excluded.max_consecutive_errors,
                config = excluded.config,
                updated_at = excluded.updated_at
            "#,
            params![
                source.id,
                source.slug,
                source.name,
                source.base_url,
                serde_json::to_string(&source.sections)?,
                source.scraper_kind,
                source.is_active,
                source.interval_minutes,
                source.max_items_per_run,
                source.auto_publish,
                source.auto_publish_delay_minutes,
                source.consecutive_errors,
                source.max_consecutive_errors,
                source.last_run_at.map(|dt| dt.to_rfc3339()),
                source.last_run_status,
                source.last_run_message,
                source.last_run_items,
                source.total_items,
                source.total_runs,
                serde_json::to_string(&source.config)?,
                source.created_at.to_rfc3339(),
                source.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Activate or deactivate a source.
    pub fn set_active(&self, id: &str, active: bool) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn.execute(
            "UPDATE sources SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, Utc::now().to_rfc3339(), id],
        )?;
        Ok(changed > 0)
    }

    /// Record a successful run: clears the error streak and updates totals.
    pub fn record_run_success(&self, id: &str, message: &str, items: i64) -> Result<()> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE sources
            SET consecutive_errors = 0,
                last_run_at = ?1, last_run_status = 'success', last_run_message = ?2,
                last_run_items = ?3,
                total_items = total_items + ?3, total_runs = total_runs + 1,
                updated_at = ?1
            WHERE id = ?4
            "#,
            params![now, message, items, id],
        )?;
        Ok(())
    }

    /// Record a failed run, deactivating the source once the error streak
    /// reaches its limit. Returns whether this call deactivated it.
    pub fn record_run_error(&self, id: &str, message: &str) -> Result<bool> {
        let conn = self.connect()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            UPDATE sources
            SET consecutive_errors = consecutive_errors + 1,
                last_run_at = ?1, last_run_status = 'error', last_run_message = ?2,
                last_run_items = 0, total_runs = total_runs + 1,
                updated_at = ?1
            WHERE id = ?3
            "#,
            params![now, message, id],
        )?;

        let deactivated = conn.execute(
            r#"
            UPDATE sources
            SET is_active = 0,
                last_run_message = 'Auto-disabled after ' || consecutive_errors
                    || ' consecutive errors: ' || ?1,
                updated_at = ?2
            WHERE id = ?3 AND is_active = 1
              AND consecutive_errors >= max_consecutive_errors
            "#,
            params![message, now, id],
        )?;
        Ok(deactivated > 0)
    }
}

fn row_to_source(row: &Row) -> rusqlite::Result<ScrapingSource> {
    Ok(ScrapingSource {
        id: row.get("id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        base_url: row.get("base_url")?,
        sections: serde_json::from_str(&row.get::<_, String>("sections")?).unwrap_or_default(),
        scraper_kind: row.get("scraper_kind")?,
        is_active: row.get("is_active")?,
        interval_minutes: row.get("interval_minutes")?,
        max_items_per_run: row.get("max_items_per_run")?,
        auto_publish: row.get("auto_publish")?,
        auto_publish_delay_minutes: row.get("auto_publish_delay_minutes")?,
        consecutive_errors: row.get("consecutive_errors")?,
        max_consecutive_errors: row.get("max_consecutive_errors")?,
        last_run_at: parse_datetime_opt(row.get("last_run_at")?),
        last_run_status: row.get("last_run_status")?,
        last_run_message: row.get("last_run_message")?,
        last_run_items: row.get("last_run_items")?,
        total_items: row.get("total_items")?,
        total_runs: row.get("total_runs")?,
        config: serde_json::from_str(&row.get::<_, String>("config")?)
            .unwrap_or(serde_json::Value::Null),
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
        updated_at: parse_datetime(&row.get::<_, String>("updated_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn repo() -> (TempDir, SourceRepository) {
        let dir = TempDir::new().unwrap();
        let repo = SourceRepository::new(&dir.path().join("test.db")).unwrap();
        (dir, repo)
    }

    fn sample() -> ScrapingSource {
        let mut s = ScrapingSource::new(
            "lagaceta".into(),
            "La Gaceta".into(),
            "https://lagaceta.example".into(),
        );
        s.is_active = true;
        s
    }

    #[test]
    fn test_save_and_get_by_slug() {
        let (_dir, repo) = repo();
        let source = sample();
        repo.save(&source).unwrap();

        let stored = repo.get_by_slug("lagaceta").unwrap().unwrap();
        assert_eq!(stored.id, source.id);
        assert_eq!(stored.name, "La Gaceta");
        assert!(stored.is_active);
    }

    #[test]
    fn test_success_resets_error_streak() {
        let (_dir, repo) = repo();
        let source = sample();
        repo.save(&source).unwrap();

        repo.record_run_error(&source.id, "timeout").unwrap();
        repo.record_run_error(&source.id, "timeout").unwrap();
        assert_eq!(repo.get(&source.id).unwrap().unwrap().consecutive_errors, 2);

        repo.record_run_success(&source.id, "12 items", 12).unwrap();
        let stored = repo.get(&source.id).unwrap().unwrap();
        assert_eq!(stored.consecutive_errors, 0);
        assert_eq!(stored.total_items, 12);
        assert_eq!(stored.last_run_status.as_deref(), Some("success"));
    }

    #[test]
    fn test_auto_deactivate_after_error_streak() {
        let (_dir, repo) = repo();
        let mut source = sample();
        source.max_consecutive_errors = 3;
        repo.save(&source).unwrap();

        assert!(!repo.record_run_error(&source.id, "dns failure").unwrap());
        assert!(!repo.record_run_error(&source.id, "dns failure").unwrap());
        // Third strike disables the source.
        assert!(repo.record_run_error(&source.id, "dns failure").unwrap());

        let stored = repo.get(&source.id).unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(stored
            .last_run_message
            .unwrap()
            .starts_with("Auto-disabled after 3"));

        // Already inactive: no repeated deactivation signal.
        assert!(!repo.record_run_error(&source.id, "dns failure").unwrap());
    }

    #[test]
    fn test_get_active_filters() {
        let (_dir, repo) = repo();
        let active = sample();
        repo.save(&active).unwrap();
        let mut inactive =
            ScrapingSource::new("otro".into(), "Otro".into(), "https://otro.example".into());
        inactive.is_active = false;
        repo.save(&inactive).unwrap();

        let list = repo.get_active().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].slug, "lagaceta");
    }
}

//! Run repository: audit trail of scrape cycles.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};

use super::{parse_datetime, parse_datetime_opt, Result};
use crate::models::{RunTrigger, ScrapingRun};

/// SQLite-backed repository for scrape run records.
#[derive(Debug)]
pub struct RunRepository {
    db_path: PathBuf,
}

impl RunRepository {
    /// Create a new run repository.
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
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                started_at TEXT NOT NULL,
                finished_at TEXT,
                trigger TEXT NOT NULL,
                source_ids TEXT NOT NULL DEFAULT '[]',
                items_scraped INTEGER NOT NULL DEFAULT 0,
                items_failed INTEGER NOT NULL DEFAULT 0,
                items_duplicate INTEGER NOT NULL DEFAULT 0,
                errors TEXT NOT NULL DEFAULT '[]'
            );

            CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
        "#,
        )?;
        Ok(())
    }

    /// Save a run record (insert or update by ID).
    pub fn save(&self, run: &ScrapingRun) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO runs (
                id, started_at, finished_at, trigger, source_ids,
                items_scraped, items_failed, items_duplicate, errors
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                finished_at = excluded.finished_at,
                items_scraped = excluded.items_scraped,
                items_failed = excluded.items_failed,
                items_duplicate = excluded.items_duplicate,
                errors = excluded.errors
            "#,
            params![
                run.id,
                run.started_at.to_rfc3339(),
                run.finished_at.map(|dt| dt.to_rfc3339()),
                serde_json::to_string(&run.trigger)?,
                serde_json::to_string(&run.source_ids)?,
                run.items_scraped,
                run.items_failed,
                run.items_duplicate,
                serde_json::to_string(&run.errors)?,
            ],
        )?;
        Ok(())
    }

    /// Get a run by ID.
    pub fn get(&self, id: &str) -> Result<Option<ScrapingRun>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM runs WHERE id = ?1")?;
        super::to_option(stmt.query_row(params![id], row_to_run))
    }

    /// Most recent runs, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<ScrapingRun>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT * FROM runs ORDER BY started_at DESC LIMIT ?1")?;
        let runs = stmt
            .query_map(params![limit as i64], row_to_run)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

fn row_to_run(row: &Row) -> rusqlite::Result<ScrapingRun> {
    Ok(ScrapingRun {
        id: row.get("id")?,
        started_at: parse_datetime(&row.get::<_, String>("started_at")?),
        finished_at: parse_datetime_opt(row.get("finished_at")?),
        trigger: serde_json::from_str(&row.get::<_, String>("trigger")?)
            .unwrap_or(RunTrigger::Scheduled),
        source_ids: serde_json::from_str(&row.get::<_, String>("source_ids")?)
            .unwrap_or_default(),
        items_scraped: row.get("items_scraped")?,
        items_failed: row.get("items_failed")?,
        items_duplicate: row.get("items_duplicate")?,
        errors: serde_json::from_str(&row.get::<_, String>("errors")?).unwrap_or_default(),
    })
}

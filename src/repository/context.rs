//! Database context: one handle bundling every repository.

use std::path::{Path, PathBuf};

use super::{ArticleRepository, ItemRepository, Result, RunRepository, SourceRepository};

/// Shared entry point for all database access.
///
/// Opens every repository against the same database file, creating
/// schemas on first use. Cheap to clone behind an `Arc`.
#[derive(Debug)]
pub struct DbContext {
    db_path: PathBuf,
    pub items: ItemRepository,
    pub sources: SourceRepository,
    pub runs: RunRepository,
    pub articles: ArticleRepository,
}

impl DbContext {
    /// Open (and initialize) the database at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self> {
        Ok(Self {
            db_path: db_path.to_path_buf(),
            items: ItemRepository::new(db_path)?,
            sources: SourceRepository::new(db_path)?,
            runs: RunRepository::new(db_path)?,
            articles: ArticleRepository::new(db_path)?,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

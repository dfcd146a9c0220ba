//! Article repository: the published output.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, Row};

use super::{parse_datetime, Result};
use crate::models::Article;

/// SQLite-backed repository for published articles.
#[derive(Debug)]
pub struct ArticleRepository {
    db_path: PathBuf,
}

impl ArticleRepository {
    /// Create a new article repository.
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
            CREATE TABLE IF NOT EXISTS articles (
                id TEXT PRIMARY KEY,
                item_id TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                summary TEXT NOT NULL,
                body TEXT NOT NULL,
                category TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                brief TEXT,
                core TEXT,
                deep TEXT,
                media TEXT NOT NULL DEFAULT '[]',
                published_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
        "#,
        )?;
        Ok(())
    }

    /// Insert a new article. Slugs are unique; the caller resolves
    /// collisions before inserting.
    pub fn insert(&self, article: &Article) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO articles (
                id, item_id, slug, title, summary, body, category, tags,
                brief, core, deep, media, published_at, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                article.id,
                article.item_id,
                article.slug,
                article.title,
                article.summary,
                article.body,
                article.category,
                serde_json::to_string(&article.tags)?,
                article.brief,
                article.core,
                article.deep,
                serde_json::to_string(&article.media)?,
                article.published_at.to_rfc3339(),
                article.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get an article by ID.
    pub fn get(&self, id: &str) -> Result<Option<Article>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT * FROM articles WHERE id = ?1")?;
        super::to_option(stmt.query_row(params![id], row_to_article))
    }

    /// Whether a slug is already taken.
    pub fn slug_exists(&self, slug: &str) -> Result<bool> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE slug = ?1",
            params![slug],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Titles of recently published articles, newest first, for duplicate
    /// screening.
    pub fn recent_titles(&self, limit: usize) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT title FROM articles ORDER BY published_at DESC LIMIT ?1")?;
        let titles = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(titles)
    }

    /// Total number of published articles.
    pub fn count(&self) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_article(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get("id")?,
        item_id: row.get("item_id")?,
        slug: row.get("slug")?,
        title: row.get("title")?,
        summary: row.get("summary")?,
        body: row.get("body")?,
        category: row.get("category")?,
        tags: serde_json::from_str(&row.get::<_, String>("tags")?).unwrap_or_default(),
        brief: row.get("brief")?,
        core: row.get("core")?,
        deep: row.get("deep")?,
        media: serde_json::from_str(&row.get::<_, String>("media")?).unwrap_or_default(),
        published_at: parse_datetime(&row.get::<_, String>("published_at")?),
        created_at: parse_datetime(&row.get::<_, String>("created_at")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample(slug: &str) -> Article {
        let now = Utc::now();
        Article {
            id: Uuid::new_v4().to_string(),
            item_id: Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            title: "El Senado aprueba el presupuesto 2026".into(),
            summary: "Resumen breve del hecho.".into(),
            body: "Cuerpo completo del artículo.".into(),
            category: Some("Política".into()),
            tags: vec!["senado".into(), "presupuesto".into()],
            brief: Some("Versión corta.".into()),
            core: None,
            deep: None,
            media: vec![crate::models::MediaRef::image(
                "https://example.com/foto.jpg".into(),
                0,
            )],
            published_at: now,
            created_at: now,
        }
    }

    #[test]
    fn test_insert_get_and_slug_exists() {
        let dir = TempDir::new().unwrap();
        let repo = ArticleRepository::new(&dir.path().join("test.db")).unwrap();

        let article = sample("senado-aprueba-presupuesto-2026");
        repo.insert(&article).unwrap();

        assert!(repo.slug_exists("senado-aprueba-presupuesto-2026").unwrap());
        assert!(!repo.slug_exists("otro-slug").unwrap());

        let stored = repo.get(&article.id).unwrap().unwrap();
        assert_eq!(stored.tags.len(), 2);
        assert_eq!(stored.media[0].kind, "image");
        assert_eq!(repo.count().unwrap(), 1);
    }

    #[test]
    fn test_recent_titles_newest_first() {
        let dir = TempDir::new().unwrap();
        let repo = ArticleRepository::new(&dir.path().join("test.db")).unwrap();

        let mut older = sample("nota-vieja");
        older.title = "Nota vieja".into();
        older.published_at = Utc::now() - chrono::Duration::hours(2);
        repo.insert(&older).unwrap();
        repo.insert(&sample("nota-nueva")).unwrap();

        let titles = repo.recent_titles(10).unwrap();
        assert_eq!(titles[0], "El Senado aprueba el presupuesto 2026");
        assert_eq!(titles[1], "Nota vieja");
    }
}

//! Publication: the shared publish primitive and the delayed
//! auto-publisher.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Article, ItemStatus, MediaRef, ScrapingItem};
use crate::repository::{DbContext, RepositoryError, Result};
use crate::slug::unique_slug;

/// Publish one `ready_to_publish` item.
///
/// Builds the article from enriched-preferred fields, resolves a unique
/// slug, stores it and links it back to the item. Every publication in
/// the system goes through here.
pub fn publish_item(db: &DbContext, item: &ScrapingItem) -> Result<Article> {
    if item.status != ItemStatus::ReadyToPublish || item.article_id.is_some() {
        return Err(RepositoryError::IllegalTransition {
            item_id: item.id.clone(),
            from: item.status.as_str().to_string(),
            to: ItemStatus::Published.as_str().to_string(),
        });
    }

    let title = item.display_title().to_string();
    let slug = unique_slug(&title, &item.id, |s| db.articles.slug_exists(s))?;

    let enrichment = item.enrichment.as_ref();
    let summary = enrichment
        .map(|e| e.summary.clone())
        .filter(|s| !s.is_empty())
        .or_else(|| item.summary.clone())
        .unwrap_or_default();
    let renderings = enrichment.map(|e| &e.renderings);
    let nonempty = |s: Option<&String>| s.filter(|s| !s.is_empty()).cloned();
    let deep = nonempty(renderings.map(|r| &r.deep));
    let body = deep.clone().unwrap_or_else(|| item.content.clone());
    let tags = enrichment
        .map(|e| e.tags.clone())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| item.tags.clone());

    let now = Utc::now();
    let article = Article {
        id: Uuid::new_v4().to_string(),
        item_id: item.id.clone(),
        slug,
        title,
        summary,
        body,
        category: Some(item.category().to_string()),
        tags,
        brief: nonempty(renderings.map(|r| &r.brief)),
        core: nonempty(renderings.map(|r| &r.core)),
        deep,
        media: item
            .image_urls
            .iter()
            .enumerate()
            .map(|(order, url)| MediaRef::image(url.clone(), order))
            .collect(),
        published_at: now,
        created_at: now,
    };

    db.articles.insert(&article)?;
    db.items.mark_published(&item.id, &article.id)?;
    info!(item_id = %item.id, slug = %article.slug, "article published");
    Ok(article)
}

/// Counters for one auto-publish pass.
#[derive(Debug, Clone, Default)]
pub struct AutoPublishStats {
    /// Titles published this pass, for notifications.
    pub published: Vec<String>,
    pub failed: usize,
}

/// Publish items from auto-publish sources whose cooling-off delay has
/// elapsed. A failing item records the error and keeps its status for
/// the next pass.
pub fn run_auto_publish(db: Arc<DbContext>, limit: usize) -> Result<AutoPublishStats> {
    let mut stats = AutoPublishStats::default();
    let due = db.items.ready_for_auto_publish(limit)?;
    if due.is_empty() {
        return Ok(stats);
    }
    info!(due = due.len(), "auto-publish pass started");

    for item in due {
        match publish_item(&db, &item) {
            Ok(article) => stats.published.push(article.title),
            Err(e) => {
                warn!(item_id = %item.id, error = %e, "auto-publish failed");
                db.items.record_error(&item.id, &e.to_string())?;
                stats.failed += 1;
            }
        }
    }

    info!(
        published = stats.published.len(),
        failed = stats.failed,
        "auto-publish pass finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichmentOutput, Renderings, ScrapingSource};
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<DbContext>) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbContext::open(&dir.path().join("test.db")).unwrap());
        (dir, db)
    }

    fn ready_item(db: &DbContext, source_slug: &str, url: &str, title: &str) -> ScrapingItem {
        let mut item = ScrapingItem::new(
            source_slug.into(),
            "http_list".into(),
            url.into(),
            "Texto original completo del artículo de prueba.".into(),
        );
        item.image_urls = vec!["https://f.example/foto.jpg".into()];
        db.items.upsert_scraped(&item).unwrap();
        db.items.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();
        db.items.set_status(&item.id, ItemStatus::ProcessingAi, None).unwrap();
        db.items
            .apply_enrichment(
                &item.id,
                &EnrichmentOutput {
                    title: title.into(),
                    summary: "Resumen enriquecido de la nota.".into(),
                    category: "Economía".into(),
                    tags: vec!["presupuesto".into()],
                    renderings: Renderings {
                        brief: "Versión corta.".into(),
                        core: "Versión central.".into(),
                        deep: "Versión en profundidad del artículo.".into(),
                    },
                    is_valid: true,
                    rejection_reason: None,
                    extra: serde_json::Value::Null,
                },
            )
            .unwrap();
        db.items
            .set_status(&item.id, ItemStatus::ReadyToPublish, None)
            .unwrap();
        db.items.get(&item.id).unwrap().unwrap()
    }

    #[test]
    fn test_publish_builds_article_and_links_item() {
        let (_dir, db) = setup();
        let item = ready_item(
            &db,
            "fuente",
            "https://f.example/nota",
            "El Senado aprueba el presupuesto 2026",
        );

        let article = publish_item(&db, &item).unwrap();
        assert_eq!(article.slug, "el-senado-aprueba-el-presupuesto-2026");
        assert_eq!(article.category.as_deref(), Some("Economía"));
        assert_eq!(article.body, "Versión en profundidad del artículo.");
        assert_eq!(article.media.len(), 1);

        let stored = db.items.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::Published);
        assert_eq!(stored.article_id.as_deref(), Some(article.id.as_str()));
    }

    #[test]
    fn test_publish_resolves_slug_collision() {
        let (_dir, db) = setup();
        let first = ready_item(
            &db,
            "fuente",
            "https://f.example/n1",
            "Un titular cualquiera de prueba",
        );
        // Different enough to not trip duplicate detection upstream, but
        // slugifying to the same value.
        let second = ready_item(
            &db,
            "fuente",
            "https://f.example/n2",
            "¡Un titular cualquiera de prueba!",
        );

        let a1 = publish_item(&db, &first).unwrap();
        let a2 = publish_item(&db, &second).unwrap();
        assert_eq!(a1.slug, "un-titular-cualquiera-de-prueba");
        assert!(a2.slug.starts_with("un-titular-cualquiera-de-prueba-"));
        assert_ne!(a1.slug, a2.slug);
    }

    #[test]
    fn test_publish_rejects_wrong_status() {
        let (_dir, db) = setup();
        let item = ScrapingItem::new(
            "fuente".into(),
            "http_list".into(),
            "https://f.example/n3".into(),
            "Texto.".into(),
        );
        db.items.upsert_scraped(&item).unwrap();

        let err = publish_item(&db, &item).unwrap_err();
        assert!(matches!(err, RepositoryError::IllegalTransition { .. }));
    }

    #[test]
    fn test_auto_publish_skips_disabled_sources() {
        let (_dir, db) = setup();

        let mut source = ScrapingSource::new(
            "manual".into(),
            "Manual".into(),
            "https://manual.example".into(),
        );
        source.is_active = true;
        source.auto_publish = false;
        source.auto_publish_delay_minutes = 0;
        db.sources.save(&source).unwrap();

        let item = ready_item(
            &db,
            "manual",
            "https://manual.example/n1",
            "Noticia que espera una publicación manual",
        );

        let stats = run_auto_publish(db.clone(), 50).unwrap();
        assert!(stats.published.is_empty());
        assert_eq!(
            db.items.get(&item.id).unwrap().unwrap().status,
            ItemStatus::ReadyToPublish
        );
    }

    #[test]
    fn test_auto_publish_honors_source_delay() {
        let (_dir, db) = setup();

        let mut source = ScrapingSource::new(
            "rapida".into(),
            "Rápida".into(),
            "https://rapida.example".into(),
        );
        source.is_active = true;
        source.auto_publish = true;
        source.auto_publish_delay_minutes = 15;
        db.sources.save(&source).unwrap();

        ready_item(
            &db,
            "rapida",
            "https://rapida.example/n1",
            "Noticia lista para publicación automática",
        );

        // Within the cooling-off window: nothing happens.
        let stats = run_auto_publish(db.clone(), 50).unwrap();
        assert!(stats.published.is_empty());

        // With no delay configured the item is due immediately.
        source.auto_publish_delay_minutes = 0;
        db.sources.save(&source).unwrap();
        let stats = run_auto_publish(db.clone(), 50).unwrap();
        assert_eq!(
            stats.published,
            vec!["Noticia lista para publicación automática".to_string()]
        );
        assert_eq!(stats.failed, 0);
    }
}

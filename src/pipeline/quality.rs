//! Quality gate: decides which enriched items are fit to publish.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fingerprint::title_similarity;
use crate::models::{ItemStatus, ScrapingItem};
use crate::repository::{DbContext, Result};

/// The fixed set of publishable categories.
pub const ALLOWED_CATEGORIES: [&str; 12] = [
    "Ciencia",
    "Cultura",
    "Deportes",
    "Economía",
    "Educación",
    "Investigación",
    "Medio Ambiente",
    "Política",
    "Salud",
    "Sociedad",
    "Tecnología",
    "Turismo",
];

/// Thresholds for the quality gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default = "default_min_title")]
    pub min_title_chars: usize,
    #[serde(default = "default_min_summary")]
    pub min_summary_chars: usize,
    #[serde(default = "default_min_brief")]
    pub min_brief_chars: usize,
    #[serde(default = "default_min_core")]
    pub min_core_chars: usize,
    #[serde(default = "default_min_deep")]
    pub min_deep_chars: usize,
    #[serde(default = "default_min_content")]
    pub min_content_chars: usize,
    /// Title similarity at or above this marks a duplicate.
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    /// How many recently published titles to screen against.
    #[serde(default = "default_published_window")]
    pub published_title_window: usize,
}

fn default_min_title() -> usize {
    20
}
fn default_min_summary() -> usize {
    50
}
fn default_min_brief() -> usize {
    20
}
fn default_min_core() -> usize {
    50
}
fn default_min_deep() -> usize {
    100
}
fn default_min_content() -> usize {
    100
}
fn default_duplicate_threshold() -> f64 {
    0.6
}
fn default_published_window() -> usize {
    200
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_title_chars: default_min_title(),
            min_summary_chars: default_min_summary(),
            min_brief_chars: default_min_brief(),
            min_core_chars: default_min_core(),
            min_deep_chars: default_min_deep(),
            min_content_chars: default_min_content(),
            duplicate_threshold: default_duplicate_threshold(),
            published_title_window: default_published_window(),
        }
    }
}

/// Counters for one gate pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GateStats {
    pub processed: usize,
    pub ready: usize,
    pub duplicates: usize,
    pub quality_failed: usize,
    pub expired: usize,
    pub stale_discarded: usize,
}

/// Quality shortcomings of one item, empty when it passes.
pub fn quality_failures(item: &ScrapingItem, config: &GateConfig) -> Vec<String> {
    let mut failures = Vec::new();

    let Some(enrichment) = &item.enrichment else {
        failures.push("sin enriquecimiento".to_string());
        return failures;
    };

    if !enrichment.is_valid {
        let reason = enrichment
            .rejection_reason
            .as_deref()
            .unwrap_or("sin motivo");
        failures.push(format!("marcada como no publicable: {reason}"));
    }

    let chars = |s: &str| s.chars().count();

    if chars(&enrichment.title) < config.min_title_chars {
        failures.push(format!(
            "título corto ({} < {})",
            chars(&enrichment.title),
            config.min_title_chars
        ));
    }
    if chars(&enrichment.summary) < config.min_summary_chars {
        failures.push(format!(
            "resumen corto ({} < {})",
            chars(&enrichment.summary),
            config.min_summary_chars
        ));
    }
    if !ALLOWED_CATEGORIES.contains(&enrichment.category.as_str()) {
        failures.push(format!("categoría inválida: {}", enrichment.category));
    }
    if chars(&enrichment.renderings.brief) < config.min_brief_chars {
        failures.push(format!(
            "versión brief corta ({} < {})",
            chars(&enrichment.renderings.brief),
            config.min_brief_chars
        ));
    }
    if chars(&enrichment.renderings.core) < config.min_core_chars {
        failures.push(format!(
            "versión core corta ({} < {})",
            chars(&enrichment.renderings.core),
            config.min_core_chars
        ));
    }
    if chars(&enrichment.renderings.deep) < config.min_deep_chars {
        failures.push(format!(
            "versión deep corta ({} < {})",
            chars(&enrichment.renderings.deep),
            config.min_deep_chars
        ));
    }
    if chars(&item.content) < config.min_content_chars {
        failures.push(format!(
            "texto original corto ({} < {})",
            chars(&item.content),
            config.min_content_chars
        ));
    }

    failures
}

/// Best similarity match of `title` among `titles`, if any reaches the
/// threshold.
fn best_duplicate(title: &str, titles: &[String], threshold: f64) -> Option<(String, f64)> {
    titles
        .iter()
        .map(|t| (t.clone(), title_similarity(title, t)))
        .filter(|(_, score)| *score >= threshold)
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

/// Run one quality-gate pass over `ai_completed` items, then sweep
/// expired work.
///
/// Per item: quality failures (the validity flag included) keep it in
/// `ai_completed` with a diagnostic, a near-duplicate title marks it
/// `duplicate`, and a clean item is promoted to `ready_to_publish`.
/// Items that keep failing are picked up by the stale sweep.
pub fn run_gate(
    db: Arc<DbContext>,
    config: &GateConfig,
    expire_ready_hours: i64,
    expire_completed_hours: i64,
) -> Result<GateStats> {
    let mut stats = GateStats::default();
    let candidates = db.items.get_by_status(ItemStatus::AiCompleted, None)?;

    let published_titles = db.articles.recent_titles(config.published_title_window)?;

    for item in candidates {
        stats.processed += 1;

        let failures = quality_failures(&item, config);
        if !failures.is_empty() {
            debug!(item_id = %item.id, ?failures, "quality check failed");
            db.items.set_status(
                &item.id,
                ItemStatus::AiCompleted,
                Some(&format!("Control de calidad: {}", failures.join("; "))),
            )?;
            stats.quality_failed += 1;
            continue;
        }

        // Screen against the queue and recent publications.
        let title = item.display_title().to_string();
        let mut screen = db.items.queued_titles(&item.id)?;
        screen.extend(published_titles.iter().cloned());

        if let Some((matched, score)) = best_duplicate(&title, &screen, config.duplicate_threshold)
        {
            db.items.set_status(
                &item.id,
                ItemStatus::Duplicate,
                Some(&format!("Duplicada ({score:.2}) de: {matched}")),
            )?;
            stats.duplicates += 1;
            continue;
        }

        db.items.set_status(
            &item.id,
            ItemStatus::ReadyToPublish,
            Some("Aprobada por control de calidad"),
        )?;
        stats.ready += 1;
    }

    stats.expired = db.items.expire_ready(expire_ready_hours)?;
    stats.stale_discarded = db.items.discard_stale_completed(expire_completed_hours)?;

    info!(
        processed = stats.processed,
        ready = stats.ready,
        duplicates = stats.duplicates,
        quality_failed = stats.quality_failed,
        expired = stats.expired,
        stale_discarded = stats.stale_discarded,
        "quality gate pass finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichmentOutput, Renderings, ScrapingItem};
    use tempfile::TempDir;

    fn good_enrichment(title: &str) -> EnrichmentOutput {
        EnrichmentOutput {
            title: title.to_string(),
            summary: "Un resumen suficientemente largo para pasar el control de calidad.".into(),
            category: "Política".into(),
            tags: vec!["senado".into()],
            renderings: Renderings {
                brief: "Una versión corta que alcanza el mínimo.".into(),
                core: "Una versión central con los caracteres necesarios para el control.".into(),
                deep: "Una versión en profundidad que desarrolla el tema con el detalle \
                       suficiente como para superar el mínimo de cien caracteres exigido."
                    .into(),
            },
            is_valid: true,
            rejection_reason: None,
            extra: serde_json::Value::Null,
        }
    }

    fn completed_item(db: &DbContext, url: &str, enrichment: EnrichmentOutput) -> ScrapingItem {
        let item = ScrapingItem::new(
            "fuente".into(),
            "http_list".into(),
            url.into(),
            "Texto original del artículo con largo más que suficiente para superar \
             el mínimo de cien caracteres del control de calidad del pipeline."
                .into(),
        );
        db.items.upsert_scraped(&item).unwrap();
        db.items.set_status(&item.id, ItemStatus::ReadyForAi, None).unwrap();
        db.items.set_status(&item.id, ItemStatus::ProcessingAi, None).unwrap();
        db.items.apply_enrichment(&item.id, &enrichment).unwrap();
        item
    }

    fn setup() -> (TempDir, Arc<DbContext>) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(DbContext::open(&dir.path().join("test.db")).unwrap());
        (dir, db)
    }

    #[test]
    fn test_clean_item_is_promoted() {
        let (_dir, db) = setup();
        let item = completed_item(
            &db,
            "https://f.example/a",
            good_enrichment("El Senado aprueba el presupuesto 2026"),
        );

        let stats = run_gate(db.clone(), &GateConfig::default(), 12, 24).unwrap();
        assert_eq!(stats.ready, 1);
        assert_eq!(
            db.items.get(&item.id).unwrap().unwrap().status,
            ItemStatus::ReadyToPublish
        );
    }

    #[test]
    fn test_short_title_stays_completed_with_diagnostic() {
        let (_dir, db) = setup();
        let mut enrichment = good_enrichment("Corto");
        enrichment.title = "Corto".into();
        let item = completed_item(&db, "https://f.example/b", enrichment);

        let stats = run_gate(db.clone(), &GateConfig::default(), 12, 24).unwrap();
        assert_eq!(stats.quality_failed, 1);

        let stored = db.items.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::AiCompleted);
        assert!(stored.status_message.unwrap().contains("título corto"));
    }

    #[test]
    fn test_invalid_flag_stays_completed_with_diagnostic() {
        let (_dir, db) = setup();
        let mut enrichment = good_enrichment("Una noticia que no es tal en absoluto");
        enrichment.is_valid = false;
        enrichment.rejection_reason = Some("publicidad".into());
        let item = completed_item(&db, "https://f.example/c", enrichment);

        let stats = run_gate(db.clone(), &GateConfig::default(), 12, 24).unwrap();
        assert_eq!(stats.quality_failed, 1);

        // Retained for retry or manual override; the stale sweep cleans
        // it up eventually.
        let stored = db.items.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.status, ItemStatus::AiCompleted);
        let message = stored.status_message.unwrap();
        assert!(message.contains("no publicable"));
        assert!(message.contains("publicidad"));
    }

    #[test]
    fn test_near_duplicate_title_is_marked() {
        let (_dir, db) = setup();
        let first = completed_item(
            &db,
            "https://f.example/d",
            good_enrichment("El Senado aprueba el presupuesto 2026"),
        );
        let second = completed_item(
            &db,
            "https://otro.example/d",
            good_enrichment("Senado aprueba el presupuesto 2026"),
        );

        let stats = run_gate(db.clone(), &GateConfig::default(), 12, 24).unwrap();
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(
            db.items.get(&first.id).unwrap().unwrap().status,
            ItemStatus::ReadyToPublish
        );
        assert_eq!(
            db.items.get(&second.id).unwrap().unwrap().status,
            ItemStatus::Duplicate
        );
    }

    #[test]
    fn test_invalid_category_fails_quality() {
        let (_dir, db) = setup();
        let mut enrichment = good_enrichment("Una noticia con categoría inventada");
        enrichment.category = "Chimentos".into();
        completed_item(&db, "https://f.example/e", enrichment);

        let stats = run_gate(db.clone(), &GateConfig::default(), 12, 24).unwrap();
        assert_eq!(stats.quality_failed, 1);
    }
}

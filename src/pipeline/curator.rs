//! Diversity curator: picks a balanced publish batch from the queue.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::publisher::publish_item;
use crate::fingerprint::title_similarity;
use crate::models::{ItemStatus, ScrapingItem};
use crate::repository::{DbContext, Result};

/// Knobs for batch curation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuratorConfig {
    /// How many items one curated batch aims for.
    #[serde(default = "default_target_count")]
    pub target_count: usize,
    #[serde(default = "default_max_per_category")]
    pub max_per_category: usize,
    #[serde(default = "default_max_per_source")]
    pub max_per_source: usize,
    /// Pairwise title similarity at or above this collapses two
    /// candidates into one cluster.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

fn default_target_count() -> usize {
    12
}
fn default_max_per_category() -> usize {
    3
}
fn default_max_per_source() -> usize {
    3
}
fn default_similarity_threshold() -> f64 {
    0.6
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            target_count: default_target_count(),
            max_per_category: default_max_per_category(),
            max_per_source: default_max_per_source(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

/// A curated selection, before (or without) publishing it.
#[derive(Debug)]
pub struct CurationPlan {
    pub selected: Vec<ScrapingItem>,
    pub category_counts: Vec<(String, usize)>,
    pub source_counts: Vec<(String, usize)>,
    /// Queue size the plan was drawn from.
    pub candidates: usize,
    /// Candidates dropped as near-duplicates of a newer one.
    pub collapsed: usize,
}

/// Result of a publishing curator run.
#[derive(Debug, Default)]
pub struct CurationOutcome {
    pub published: Vec<String>,
    pub failed: usize,
}

pub struct Curator {
    db: Arc<DbContext>,
    config: CuratorConfig,
}

impl Curator {
    pub fn new(db: Arc<DbContext>, config: CuratorConfig) -> Self {
        Self { db, config }
    }

    /// Draw a curated batch from the publish queue without touching it.
    ///
    /// Newest-first through three passes: collapse near-duplicate titles,
    /// seed one item per category, then fill by recency under the
    /// per-category and per-source caps. Caps are relaxed only when the
    /// queue cannot otherwise reach the target.
    pub fn plan(&self) -> Result<CurationPlan> {
        let mut candidates = self.db.items.get_by_status(ItemStatus::ReadyToPublish, None)?;
        let total = candidates.len();
        candidates.sort_by(|a, b| b.scraped_at.cmp(&a.scraped_at));

        // Pass 1: collapse clusters of near-identical titles, keeping the
        // newest representative.
        let mut reps: Vec<ScrapingItem> = Vec::new();
        for item in candidates {
            let title = item.display_title();
            let dup = reps.iter().any(|kept| {
                title_similarity(title, kept.display_title()) >= self.config.similarity_threshold
            });
            if !dup {
                reps.push(item);
            }
        }
        let collapsed = total - reps.len();

        // Pass 2: seed one newest item per category.
        let mut selected: Vec<ScrapingItem> = Vec::new();
        let mut seen_categories: HashMap<String, usize> = HashMap::new();
        let mut seen_sources: HashMap<String, usize> = HashMap::new();
        for item in &reps {
            if selected.len() >= self.config.target_count {
                break;
            }
            let category = item.category().to_string();
            if seen_categories.contains_key(&category) {
                continue;
            }
            seen_categories.insert(category, 1);
            *seen_sources.entry(item.source_key.clone()).or_insert(0) += 1;
            selected.push(item.clone());
        }

        // Pass 3: fill by recency under the caps.
        for item in &reps {
            if selected.len() >= self.config.target_count {
                break;
            }
            if selected.iter().any(|s| s.id == item.id) {
                continue;
            }
            let category = item.category().to_string();
            let cat_count = seen_categories.get(&category).copied().unwrap_or(0);
            let src_count = seen_sources.get(&item.source_key).copied().unwrap_or(0);
            if cat_count >= self.config.max_per_category
                || src_count >= self.config.max_per_source
            {
                continue;
            }
            *seen_categories.entry(category).or_insert(0) += 1;
            *seen_sources.entry(item.source_key.clone()).or_insert(0) += 1;
            selected.push(item.clone());
        }

        // Relaxation: caps only matter when there is enough to choose from.
        if selected.len() < self.config.target_count {
            for item in &reps {
                if selected.len() >= self.config.target_count {
                    break;
                }
                if selected.iter().any(|s| s.id == item.id) {
                    continue;
                }
                *seen_categories
                    .entry(item.category().to_string())
                    .or_insert(0) += 1;
                *seen_sources.entry(item.source_key.clone()).or_insert(0) += 1;
                selected.push(item.clone());
            }
        }

        let mut category_counts: Vec<(String, usize)> = Vec::new();
        let mut source_counts: Vec<(String, usize)> = Vec::new();
        for item in &selected {
            bump(&mut category_counts, item.category());
            bump(&mut source_counts, &item.source_key);
        }

        Ok(CurationPlan {
            selected,
            category_counts,
            source_counts,
            candidates: total,
            collapsed,
        })
    }

    /// Plan a batch and publish it.
    pub fn run(&self) -> Result<(CurationPlan, CurationOutcome)> {
        let plan = self.plan()?;
        let mut outcome = CurationOutcome::default();

        for item in &plan.selected {
            match publish_item(&self.db, item) {
                Ok(article) => outcome.published.push(article.title),
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "curated publish failed");
                    self.db.items.record_error(&item.id, &e.to_string())?;
                    outcome.failed += 1;
                }
            }
        }

        info!(
            candidates = plan.candidates,
            collapsed = plan.collapsed,
            published = outcome.published.len(),
            failed = outcome.failed,
            "curator run finished"
        );
        Ok((plan, outcome))
    }
}

fn bump(counts: &mut Vec<(String, usize)>, key: &str) {
    match counts.iter_mut().find(|(k, _)| k == key) {
        Some((_, n)) => *n += 1,
        None => counts.push((key.to_string(), 1)),
    }
}

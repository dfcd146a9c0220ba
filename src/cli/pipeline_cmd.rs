//! One-shot pipeline stage commands.

use std::sync::Arc;

use anyhow::bail;
use console::style;

use crate::config::Settings;
use crate::enrich::{self, ChatEnricher};
use crate::models::RunTrigger;
use crate::pipeline::{self, Curator};
use crate::repository::DbContext;
use crate::scrape;

fn open(settings: &Settings) -> anyhow::Result<Arc<DbContext>> {
    Ok(Arc::new(DbContext::open(&settings.db_path)?))
}

/// Run one scrape cycle and print its outcome.
pub async fn cmd_scrape(
    settings: &Settings,
    source_ids: Vec<String>,
    workers: usize,
) -> anyhow::Result<()> {
    let db = open(settings)?;
    let ids = if source_ids.is_empty() {
        None
    } else {
        Some(source_ids)
    };
    let trigger = RunTrigger::Manual {
        requested_by: Some("cli".to_string()),
    };

    let outcome = scrape::run_cycle(db, trigger, ids, workers).await?;
    println!(
        "{} Scrape cycle finished: {} new, {} refreshed, {} failed",
        style("✓").green(),
        outcome.run.items_scraped,
        outcome.run.items_duplicate,
        outcome.run.items_failed
    );
    for error in &outcome.run.errors {
        println!("  {} {}", style("!").yellow(), error);
    }
    for name in &outcome.deactivated {
        println!("  {} Source deactivated: {}", style("⛔").red(), name);
    }
    Ok(())
}

/// Run one enrichment pass.
pub async fn cmd_enrich(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    if settings.chat.api_key.is_empty() {
        bail!("no API key configured (set OPENAI_API_KEY or chat.api_key)");
    }
    let db = open(settings)?;
    let enricher = ChatEnricher::new(settings.chat.clone())?;

    let stats = enrich::run_pass(db, &enricher, settings.live.lookback_hours, limit).await?;
    println!(
        "{} Enrichment pass finished: {} queued, {} enriched, {} failed",
        style("✓").green(),
        stats.queued,
        stats.enriched,
        stats.failed
    );
    Ok(())
}

/// Run the quality gate over enriched items.
pub fn cmd_prepare(settings: &Settings) -> anyhow::Result<()> {
    let db = open(settings)?;
    let stats = pipeline::run_gate(
        db,
        &settings.gate,
        settings.live.expire_ready_hours,
        settings.live.expire_completed_hours,
    )?;
    println!(
        "{} Quality gate finished: {} processed, {} ready, {} duplicates, {} held back",
        style("✓").green(),
        stats.processed,
        stats.ready,
        stats.duplicates,
        stats.quality_failed
    );
    if stats.expired + stats.stale_discarded > 0 {
        println!(
            "  {} expired: {}, stale discarded: {}",
            style("·").dim(),
            stats.expired,
            stats.stale_discarded
        );
    }
    Ok(())
}

/// Publish delay-elapsed items from auto-publish sources.
pub fn cmd_publish(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    let db = open(settings)?;
    let stats = pipeline::run_auto_publish(db, limit)?;
    println!(
        "{} Published {} articles ({} failed)",
        style("✓").green(),
        stats.published.len(),
        stats.failed
    );
    for title in &stats.published {
        println!("  • {title}");
    }
    Ok(())
}

/// Pick a diversity-balanced batch, preview it or publish it.
pub fn cmd_curate(settings: &Settings, dry_run: bool) -> anyhow::Result<()> {
    let db = open(settings)?;
    let curator = Curator::new(db, settings.curator.clone());

    if dry_run {
        let plan = curator.plan()?;
        println!(
            "Curation preview: {} candidates, {} collapsed as near-duplicates, {} selected",
            plan.candidates,
            plan.collapsed,
            plan.selected.len()
        );
        for item in &plan.selected {
            println!(
                "  • [{}] {} ({})",
                item.category(),
                item.display_title(),
                item.source_key
            );
        }
        return Ok(());
    }

    let (plan, outcome) = curator.run()?;
    println!(
        "{} Curated batch published: {} of {} candidates ({} failed)",
        style("✓").green(),
        outcome.published.len(),
        plan.candidates,
        outcome.failed
    );
    for title in &outcome.published {
        println!("  • {title}");
    }
    Ok(())
}

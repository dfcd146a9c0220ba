//! One scrape cycle: fan sources out over a worker pool and record the
//! run in the audit trail.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use super::{scraper_for, Ingestor};
use crate::models::{RunTrigger, ScrapingRun, ScrapingSource};
use crate::repository::DbContext;

/// What a finished cycle produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub run: ScrapingRun,
    /// Names of sources auto-disabled during this cycle.
    pub deactivated: Vec<String>,
}

/// Run one scrape cycle over the given sources.
///
/// `source_ids: None` means every active source. Sources are pulled from
/// a shared queue by up to `workers` concurrent tasks; one failing source
/// never aborts the cycle.
pub async fn run_cycle(
    db: Arc<DbContext>,
    trigger: RunTrigger,
    source_ids: Option<Vec<String>>,
    workers: usize,
) -> anyhow::Result<CycleOutcome> {
    let mut sources: Vec<ScrapingSource> = match &source_ids {
        None => db.sources.get_active()?,
        Some(ids) => {
            let mut picked = Vec::new();
            for id in ids {
                match db.sources.get(id)? {
                    Some(s) if s.is_active => picked.push(s),
                    Some(s) => warn!(source = %s.slug, "source inactive, skipping"),
                    None => warn!(source_id = %id, "unknown source id, skipping"),
                }
            }
            picked
        }
    };

    // Scheduled cycles respect each source's own cadence; manual runs
    // take whatever they were given.
    if matches!(trigger, RunTrigger::Scheduled) {
        let now = Utc::now();
        sources.retain(|s| match s.last_run_at {
            Some(last) => now - last >= Duration::minutes(s.interval_minutes),
            None => true,
        });
    }

    let mut run = ScrapingRun::start(trigger, sources.iter().map(|s| s.id.clone()).collect());
    db.runs.save(&run)?;

    if sources.is_empty() {
        info!("scrape cycle: no active sources");
        run.finished_at = Some(Utc::now());
        db.runs.save(&run)?;
        return Ok(CycleOutcome {
            run,
            deactivated: Vec::new(),
        });
    }

    info!(
        run_id = %run.id,
        sources = sources.len(),
        trigger = %run.trigger.describe(),
        "scrape cycle started"
    );

    let queue = Arc::new(Mutex::new(VecDeque::from(sources)));
    let scraped = Arc::new(AtomicUsize::new(0));
    let duplicate = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(Mutex::new(Vec::new()));
    let deactivated = Arc::new(Mutex::new(Vec::new()));

    let worker_count = workers.clamp(1, queue.lock().unwrap().len());
    let mut handles = Vec::with_capacity(worker_count);

    for worker_id in 0..worker_count {
        let db = db.clone();
        let queue = queue.clone();
        let scraped = scraped.clone();
        let duplicate = duplicate.clone();
        let failed = failed.clone();
        let errors = errors.clone();
        let deactivated = deactivated.clone();
        let run_id = run.id.clone();

        let handle = tokio::spawn(async move {
            let ingestor = Ingestor::new(db.clone());

            loop {
                let source = match queue.lock().unwrap().pop_front() {
                    Some(s) => s,
                    None => break,
                };

                let Some(scraper) = scraper_for(&source.scraper_kind) else {
                    let msg = format!("{}: unknown scraper kind {}", source.slug, source.scraper_kind);
                    warn!(worker_id, "{msg}");
                    failed.fetch_add(1, Ordering::Relaxed);
                    errors.lock().unwrap().push(msg.clone());
                    let _ = db.sources.record_run_error(&source.id, &msg);
                    continue;
                };

                match scraper.scrape(&source).await {
                    Ok(batch) => {
                        let total = batch.len();
                        match ingestor.ingest_batch(&source, scraper.name(), &run_id, batch) {
                            Ok(stats) => {
                                scraped.fetch_add(stats.new_items, Ordering::Relaxed);
                                duplicate.fetch_add(stats.refreshed, Ordering::Relaxed);
                                info!(
                                    worker_id,
                                    source = %source.slug,
                                    new = stats.new_items,
                                    refreshed = stats.refreshed,
                                    "source scraped"
                                );
                                let message = format!(
                                    "{} articles ({} new, {} refreshed)",
                                    total, stats.new_items, stats.refreshed
                                );
                                let _ = db.sources.record_run_success(
                                    &source.id,
                                    &message,
                                    stats.new_items as i64,
                                );
                            }
                            Err(e) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                let msg = format!("{}: ingest failed: {}", source.slug, e);
                                error!(worker_id, "{msg}");
                                errors.lock().unwrap().push(msg.clone());
                                let _ = db.sources.record_run_error(&source.id, &msg);
                            }
                        }
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        let msg = format!("{}: scrape failed: {}", source.slug, e);
                        warn!(worker_id, "{msg}");
                        errors.lock().unwrap().push(msg.clone());
                        match db.sources.record_run_error(&source.id, &msg) {
                            Ok(true) => {
                                deactivated.lock().unwrap().push(source.name.clone());
                            }
                            Ok(false) => {}
                            Err(e) => error!(source = %source.slug, "source update failed: {e}"),
                        }
                    }
                }
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        let _ = handle.await;
    }

    run.items_scraped = scraped.load(Ordering::Relaxed) as i64;
    run.items_duplicate = duplicate.load(Ordering::Relaxed) as i64;
    run.items_failed = failed.load(Ordering::Relaxed) as i64;
    run.errors = std::mem::take(&mut *errors.lock().unwrap());
    run.finished_at = Some(Utc::now());
    db.runs.save(&run)?;

    info!(
        run_id = %run.id,
        scraped = run.items_scraped,
        duplicate = run.items_duplicate,
        failed = run.items_failed,
        "scrape cycle finished"
    );

    let deactivated = std::mem::take(&mut *deactivated.lock().unwrap());
    Ok(CycleOutcome { run, deactivated })
}

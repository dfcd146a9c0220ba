//! The service heart: a 60-second control loop driving every pipeline
//! stage, steered by a shared [`Controller`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tracing::{error, info};

use crate::config::{LiveConfig, LiveConfigPatch};
use crate::enrich::{self, Enricher};
use crate::models::RunTrigger;
use crate::notify::{templates, Notifier};
use crate::pipeline::{self, Curator, CuratorConfig, GateConfig};
use crate::repository::DbContext;
use crate::scrape;

/// How often the loop wakes up on its own.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// A manual request for the scheduler, executed on the next tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scrape { source_ids: Option<Vec<String>> },
    Enrich,
    Prepare,
    Publish,
    Curate,
    /// Reset stage timers so everything runs on the next tick.
    Restart,
}

impl Command {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Scrape { .. } => "scrape",
            Self::Enrich => "enrich",
            Self::Prepare => "prepare",
            Self::Publish => "publish",
            Self::Curate => "curate",
            Self::Restart => "restart",
        }
    }
}

/// Snapshot of scheduler bookkeeping for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub started_at: DateTime<Utc>,
    pub last_scrape_at: Option<DateTime<Utc>>,
    pub last_enrich_at: Option<DateTime<Utc>>,
    pub last_curate_at: Option<DateTime<Utc>>,
    pub ticks: u64,
    pub pending_commands: usize,
}

/// Shared steering surface between the loop, the HTTP handlers and the
/// CLI: live config, command queue, shutdown flag and status snapshot.
pub struct Controller {
    live: RwLock<LiveConfig>,
    commands: Mutex<VecDeque<Command>>,
    wakeup: Notify,
    shutdown: AtomicBool,
    status: Mutex<SchedulerStatus>,
}

impl Controller {
    pub fn new(live: LiveConfig) -> Arc<Self> {
        Arc::new(Self {
            live: RwLock::new(live),
            commands: Mutex::new(VecDeque::new()),
            wakeup: Notify::new(),
            shutdown: AtomicBool::new(false),
            status: Mutex::new(SchedulerStatus {
                started_at: Utc::now(),
                last_scrape_at: None,
                last_enrich_at: None,
                last_curate_at: None,
                ticks: 0,
                pending_commands: 0,
            }),
        })
    }

    /// Queue a command and wake the loop early.
    pub fn enqueue(&self, command: Command) {
        info!(command = command.describe(), "command queued");
        self.commands.lock().unwrap().push_back(command);
        self.wakeup.notify_one();
    }

    fn next_command(&self) -> Option<Command> {
        self.commands.lock().unwrap().pop_front()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wakeup.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub async fn live(&self) -> LiveConfig {
        self.live.read().await.clone()
    }

    /// Apply a patch to the live config, returning the merged result.
    pub async fn update_live(&self, patch: LiveConfigPatch) -> LiveConfig {
        let mut live = self.live.write().await;
        live.apply(patch);
        live.clone()
    }

    pub fn status(&self) -> SchedulerStatus {
        let mut status = self.status.lock().unwrap().clone();
        status.pending_commands = self.commands.lock().unwrap().len();
        status
    }

    fn touch(&self, f: impl FnOnce(&mut SchedulerStatus)) {
        f(&mut self.status.lock().unwrap());
    }
}

/// The scheduling loop and the stages it drives.
pub struct Scheduler {
    db: Arc<DbContext>,
    controller: Arc<Controller>,
    enricher: Arc<dyn Enricher>,
    notifier: Arc<Notifier>,
    gate: GateConfig,
    curator: CuratorConfig,
    last_scrape: Option<DateTime<Utc>>,
    last_enrich: Option<DateTime<Utc>>,
    last_curate: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(
        db: Arc<DbContext>,
        controller: Arc<Controller>,
        enricher: Arc<dyn Enricher>,
        notifier: Arc<Notifier>,
        gate: GateConfig,
        curator: CuratorConfig,
    ) -> Self {
        Self {
            db,
            controller,
            enricher,
            notifier,
            gate,
            curator,
            last_scrape: None,
            last_enrich: None,
            last_curate: None,
        }
    }

    /// Run until shutdown is requested.
    pub async fn run(mut self) {
        info!("scheduler started");
        loop {
            if self.controller.is_shutdown() {
                break;
            }

            while let Some(command) = self.controller.next_command() {
                self.execute(command).await;
                if self.controller.is_shutdown() {
                    break;
                }
            }
            if self.controller.is_shutdown() {
                break;
            }

            let live = self.controller.live().await;
            if live.scrape_enabled && due(self.last_scrape, live.scrape_interval_minutes) {
                self.do_scrape(live.selected_source_ids.clone(), RunTrigger::Scheduled)
                    .await;
            }
            if live.enrich_enabled && due(self.last_enrich, live.enrich_interval_minutes) {
                self.do_enrich(&live).await;
                if live.prepare_enabled {
                    self.do_prepare(&live).await;
                }
                if live.auto_publish_enabled {
                    self.do_publish(&live).await;
                }
            }
            if live.curator_enabled && due(self.last_curate, live.curator_interval_minutes) {
                self.do_curate().await;
            }

            self.controller.touch(|s| s.ticks += 1);
            tokio::select! {
                _ = tokio::time::sleep(TICK_INTERVAL) => {}
                _ = self.controller.wakeup.notified() => {}
            }
        }
        info!("scheduler stopped");
    }

    async fn execute(&mut self, command: Command) {
        let live = self.controller.live().await;
        match command {
            Command::Scrape { source_ids } => {
                let ids = source_ids.or_else(|| live.selected_source_ids.clone());
                self.do_scrape(ids, RunTrigger::Manual { requested_by: None })
                    .await;
            }
            Command::Enrich => self.do_enrich(&live).await,
            Command::Prepare => self.do_prepare(&live).await,
            Command::Publish => self.do_publish(&live).await,
            Command::Curate => self.do_curate().await,
            Command::Restart => {
                info!("stage timers reset");
                self.last_scrape = None;
                self.last_enrich = None;
                self.last_curate = None;
            }
        }
    }

    async fn do_scrape(&mut self, source_ids: Option<Vec<String>>, trigger: RunTrigger) {
        self.last_scrape = Some(Utc::now());
        let live = self.controller.live().await;
        match scrape::run_cycle(self.db.clone(), trigger, source_ids, live.scrape_workers).await {
            Ok(outcome) => {
                self.controller.touch(|s| s.last_scrape_at = Some(Utc::now()));
                for name in &outcome.deactivated {
                    self.notifier.send_high(templates::source_deactivated(name));
                }
                if outcome.run.items_scraped > 0 || !outcome.run.errors.is_empty() {
                    self.notifier.send(templates::scrape_summary(&outcome.run));
                }
            }
            Err(e) => error!(error = %e, "scrape cycle failed"),
        }
    }

    async fn do_enrich(&mut self, live: &LiveConfig) {
        self.last_enrich = Some(Utc::now());
        match enrich::run_pass(
            self.db.clone(),
            self.enricher.as_ref(),
            live.lookback_hours,
            live.enrich_batch_limit,
        )
        .await
        {
            Ok(_) => self.controller.touch(|s| s.last_enrich_at = Some(Utc::now())),
            Err(e) => error!(error = %e, "enrichment pass failed"),
        }
    }

    async fn do_prepare(&mut self, live: &LiveConfig) {
        match pipeline::run_gate(
            self.db.clone(),
            &self.gate,
            live.expire_ready_hours,
            live.expire_completed_hours,
        ) {
            Ok(stats) => {
                if stats.processed > 0 {
                    self.notifier.send(templates::gate_summary(&stats));
                }
            }
            Err(e) => error!(error = %e, "quality gate pass failed"),
        }
    }

    async fn do_publish(&mut self, live: &LiveConfig) {
        match pipeline::run_auto_publish(self.db.clone(), live.publish_batch_limit) {
            Ok(stats) if !stats.published.is_empty() => {
                self.notifier.send(templates::published_batch(&stats.published));
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "auto-publish pass failed"),
        }
    }

    async fn do_curate(&mut self) {
        self.last_curate = Some(Utc::now());
        let curator = Curator::new(self.db.clone(), self.curator.clone());
        match curator.run() {
            Ok((_, outcome)) => {
                self.controller.touch(|s| s.last_curate_at = Some(Utc::now()));
                if !outcome.published.is_empty() {
                    self.notifier.send(templates::published_batch(&outcome.published));
                }
            }
            Err(e) => error!(error = %e, "curator run failed"),
        }
    }
}

fn due(last: Option<DateTime<Utc>>, interval_minutes: i64) -> bool {
    match last {
        None => true,
        Some(last) => Utc::now() - last >= chrono::Duration::minutes(interval_minutes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_on_first_run_and_after_interval() {
        assert!(due(None, 60));
        assert!(!due(Some(Utc::now()), 60));
        assert!(due(Some(Utc::now() - chrono::Duration::minutes(61)), 60));
    }

    #[tokio::test]
    async fn test_controller_queues_and_drains_commands() {
        let controller = Controller::new(LiveConfig::default());
        controller.enqueue(Command::Enrich);
        controller.enqueue(Command::Scrape { source_ids: None });

        assert_eq!(controller.status().pending_commands, 2);
        assert_eq!(controller.next_command(), Some(Command::Enrich));
        assert_eq!(
            controller.next_command(),
            Some(Command::Scrape { source_ids: None })
        );
        assert_eq!(controller.next_command(), None);
    }

    #[tokio::test]
    async fn test_controller_live_patch() {
        let controller = Controller::new(LiveConfig::default());
        let patch: crate::config::LiveConfigPatch =
            serde_json::from_str(r#"{"scrape_enabled": false}"#).unwrap();
        let merged = controller.update_live(patch).await;
        assert!(!merged.scrape_enabled);
        assert!(!controller.live().await.scrape_enabled);
    }

    #[test]
    fn test_shutdown_flag() {
        let controller = Controller::new(LiveConfig::default());
        assert!(!controller.is_shutdown());
        controller.request_shutdown();
        assert!(controller.is_shutdown());
    }
}

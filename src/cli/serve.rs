//! Serve command: scheduler loop plus the control server.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::{self, Settings};
use crate::control::{self, LogHub};
use crate::enrich::{ChatEnricher, Enricher};
use crate::notify::{templates, Notifier};
use crate::repository::DbContext;
use crate::scheduler::{Controller, Scheduler};

/// Open the database, retrying a bounded number of times before giving
/// up. An unreachable database is fatal for the service.
async fn open_db(path: &Path, attempts: u32, delay: Duration) -> anyhow::Result<Arc<DbContext>> {
    let mut attempt = 1;
    loop {
        match DbContext::open(path) {
            Ok(db) => return Ok(Arc::new(db)),
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "database open failed, retrying");
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "database unreachable after {attempts} attempts: {}",
                    path.display()
                )))
            }
        }
    }
}

/// Run the scheduler and the control server until shutdown.
pub async fn cmd_serve(settings: &Settings, logs: Arc<LogHub>) -> anyhow::Result<()> {
    let db = open_db(&settings.db_path, 3, Duration::from_secs(2)).await?;

    let mut live = config::load_live(&settings.live_config_path, &settings.live)?;
    if settings.chat.api_key.is_empty() && live.enrich_enabled {
        warn!("no API key configured, enrichment disabled");
        live.enrich_enabled = false;
    }
    let controller = Controller::new(live);

    let notifier = Notifier::new(settings.notifier.clone());
    let notifier_task = notifier.start();

    let enricher: Arc<dyn Enricher> = Arc::new(ChatEnricher::new(settings.chat.clone())?);
    let scheduler = Scheduler::new(
        db.clone(),
        controller.clone(),
        enricher,
        notifier.clone(),
        settings.gate.clone(),
        settings.curator.clone(),
    );
    let scheduler_task = tokio::spawn(scheduler.run());

    {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, shutting down");
                controller.request_shutdown();
            }
        });
    }

    notifier.send(templates::startup(&settings.bind_addr));

    control::serve(settings, db, controller.clone(), logs, notifier.clone()).await?;

    controller.request_shutdown();
    let _ = scheduler_task.await;
    notifier_task.abort();
    Ok(())
}

//! Control server: HTTP surface for operating the running service.

mod handlers;
mod logs;
mod routes;

pub use logs::{LogEntry, LogHub, LogLayer, LOG_BUFFER_CAP};
pub use routes::create_router;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::pipeline::CuratorConfig;
use crate::notify::Notifier;
use crate::repository::DbContext;
use crate::scheduler::Controller;

/// Shared state for the control server.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbContext>,
    pub controller: Arc<Controller>,
    pub logs: Arc<LogHub>,
    pub notifier: Arc<Notifier>,
    pub curator_config: CuratorConfig,
    pub live_config_path: PathBuf,
}

/// Start the control server; returns when shutdown is requested.
pub async fn serve(
    settings: &Settings,
    db: Arc<DbContext>,
    controller: Arc<Controller>,
    logs: Arc<LogHub>,
    notifier: Arc<Notifier>,
) -> anyhow::Result<()> {
    let state = AppState {
        db,
        controller: controller.clone(),
        logs,
        notifier,
        curator_config: settings.curator.clone(),
        live_config_path: settings.live_config_path.clone(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "control server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !controller.is_shutdown() {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        })
        .await?;
    Ok(())
}

//! Request handlers for the control server.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use super::AppState;
use crate::config::{save_live, LiveConfig, LiveConfigPatch};
use crate::notify::templates;
use crate::pipeline::Curator;
use crate::scheduler::Command;

/// Any handler failure maps to a 500 with the error text.
pub struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

fn ack(command: &str) -> Json<serde_json::Value> {
    Json(json!({ "status": "queued", "command": command }))
}

/// GET /status
pub async fn status(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let items: serde_json::Map<String, serde_json::Value> = state
        .db
        .items
        .counts_by_status()?
        .into_iter()
        .map(|(status, count)| (status, json!(count)))
        .collect();
    let sources = state.db.sources.get_all()?;
    let active = sources.iter().filter(|s| s.is_active).count();
    let runs = state.db.runs.recent(5)?;

    Ok(Json(json!({
        "scheduler": state.controller.status(),
        "live": state.controller.live().await,
        "items": items,
        "sources": { "total": sources.len(), "active": active },
        "articles": state.db.articles.count()?,
        "recent_runs": runs,
    })))
}

#[derive(Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_log_limit")]
    pub limit: usize,
}

fn default_log_limit() -> usize {
    100
}

/// GET /logs — recent entries as JSON, or a live stream when the client
/// asks for `text/event-stream`.
pub async fn logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> Response {
    let wants_stream = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/event-stream"))
        .unwrap_or(false);

    if wants_stream {
        let stream = BroadcastStream::new(state.logs.subscribe()).filter_map(|result| async move {
            // A lagged receiver just skips what it missed.
            let entry = result.ok()?;
            Event::default().json_data(&entry).ok().map(Ok::<_, Infallible>)
        });
        Sse::new(stream)
            .keep_alive(
                KeepAlive::new()
                    .interval(Duration::from_secs(30))
                    .text("keep-alive"),
            )
            .into_response()
    } else {
        Json(state.logs.recent(query.limit)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RunNowRequest {
    #[serde(default)]
    pub source_ids: Option<Vec<String>>,
}

/// POST /run-now — queue a scrape cycle.
pub async fn run_now(
    State(state): State<AppState>,
    body: Option<Json<RunNowRequest>>,
) -> Json<serde_json::Value> {
    let source_ids = body.and_then(|Json(req)| req.source_ids);
    state.controller.enqueue(Command::Scrape { source_ids });
    ack("scrape")
}

/// POST /process-ai — queue an enrichment pass.
pub async fn process_ai(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.controller.enqueue(Command::Enrich);
    ack("enrich")
}

/// POST /auto-prepare — queue a quality-gate pass.
pub async fn auto_prepare(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.controller.enqueue(Command::Prepare);
    ack("prepare")
}

/// POST /auto-publish — queue an auto-publish pass.
pub async fn auto_publish(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.controller.enqueue(Command::Publish);
    ack("publish")
}

#[derive(Debug, Default, Deserialize)]
pub struct CurateRequest {
    #[serde(default)]
    pub dry_run: bool,
}

/// POST /curate — queue a curator run, or preview the selection with
/// `{"dry_run": true}`.
pub async fn curate(
    State(state): State<AppState>,
    body: Option<Json<CurateRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let dry_run = body.map(|Json(req)| req.dry_run).unwrap_or(false);
    if !dry_run {
        state.controller.enqueue(Command::Curate);
        return Ok(ack("curate"));
    }

    let curator = Curator::new(state.db.clone(), state.curator_config.clone());
    let plan = curator.plan()?;
    let selected: Vec<serde_json::Value> = plan
        .selected
        .iter()
        .map(|item| {
            json!({
                "id": item.id,
                "title": item.display_title(),
                "category": item.category(),
                "source": item.source_key,
            })
        })
        .collect();

    Ok(Json(json!({
        "dry_run": true,
        "candidates": plan.candidates,
        "collapsed": plan.collapsed,
        "selected": selected,
        "category_counts": plan.category_counts,
        "source_counts": plan.source_counts,
    })))
}

/// POST /restart — reset stage timers so everything runs next tick.
pub async fn restart(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.controller.enqueue(Command::Restart);
    ack("restart")
}

/// POST /stop — cooperative shutdown.
pub async fn stop(State(state): State<AppState>) -> Json<serde_json::Value> {
    info!("shutdown requested over control API");
    state.notifier.send_high(templates::shutdown());
    state.controller.request_shutdown();
    Json(json!({ "status": "stopping" }))
}

/// GET /config
pub async fn get_config(State(state): State<AppState>) -> Json<LiveConfig> {
    Json(state.controller.live().await)
}

/// PUT /config — merge a partial update and persist it.
pub async fn put_config(
    State(state): State<AppState>,
    Json(patch): Json<LiveConfigPatch>,
) -> Result<Json<LiveConfig>, ApiError> {
    let merged = state.controller.update_live(patch).await;
    save_live(&state.live_config_path, &merged)?;
    info!("live config updated");
    Ok(Json(merged))
}

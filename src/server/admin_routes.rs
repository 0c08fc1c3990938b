//! Admin API: run status, triggering scrapes, the audit trail and data resets.
//!
//! Every handler takes [`AdminAccess`] first, so requests without the shared
//! secret are refused before anything else is looked at.

use super::admin_key::AdminAccess;
use super::server::format_uptime;
use super::state::{GuardedRecordStore, ServerState};
use crate::scrape_store::{AuditLogFilter, RunLogStatus};
use crate::scraping::{Orchestrator, ScrapeError, ScrapeSource, ALL_SOURCES_KEY};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::{error, info};

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "success": false, "error": message.into() })),
    )
        .into_response()
}

fn valid_sources_hint(orchestrator: &Orchestrator) -> String {
    let mut keys: Vec<&str> = orchestrator
        .catalog()
        .sources()
        .iter()
        .map(ScrapeSource::as_str)
        .collect();
    keys.push(ALL_SOURCES_KEY);
    keys.join(", ")
}

async fn get_status(
    _admin: AdminAccess,
    State(state): State<ServerState>,
) -> Response {
    let snapshot = match state.orchestrator.status(state.config.recent_logs_limit) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to read scrape status: {:#}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read status");
        }
    };

    let mut database = Map::new();
    for source in ScrapeSource::ALL {
        match state.record_store.count_records(source) {
            Ok(count) => {
                database.insert(source.as_str().to_string(), json!(count));
            }
            Err(e) => {
                error!("Failed to count {} records: {:#}", source, e);
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to read record counts",
                );
            }
        }
    }

    Json(json!({
        "success": true,
        "system": {
            "uptime": format_uptime(state.start_time.elapsed()),
            "hash": state.hash,
            "sources": state.orchestrator.catalog().sources(),
        },
        "scraping": snapshot.scraping,
        "database": database,
        "recent_logs": snapshot.recent_logs,
    }))
    .into_response()
}

async fn trigger_scrape(
    _admin: AdminAccess,
    State(orchestrator): State<Orchestrator>,
    Path(source): Path<String>,
) -> Response {
    match orchestrator.trigger(&source) {
        Ok(ack) => {
            info!("Scrape of '{}' triggered via admin API", ack.selector);
            (
                StatusCode::ACCEPTED,
                Json(json!({
                    "success": true,
                    "source": ack.selector,
                    "sources": ack.sources,
                    "message": format!("Scraping started for {}", ack.selector),
                    "tip": "Check /api/admin/status for progress",
                })),
            )
                .into_response()
        }
        Err(ScrapeError::UnknownSource(key)) => error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "Unknown source '{}'. Valid sources: {}",
                key,
                valid_sources_hint(&orchestrator)
            ),
        ),
        Err(e) => {
            error!("Failed to trigger scrape of '{}': {}", source, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn stop_scrape(_admin: AdminAccess, State(orchestrator): State<Orchestrator>) -> Response {
    let ack = orchestrator.request_stop();
    Json(json!({
        "success": true,
        "interrupted": ack.interrupted,
        "running": ack.running,
        "message": "Stop requested. Running scrapes cannot be interrupted and will finish on their own.",
    }))
    .into_response()
}

#[derive(Deserialize, Debug, Default)]
struct LogsQuery {
    source: Option<String>,
    status: Option<String>,
    limit: Option<String>,
}

impl LogsQuery {
    fn into_filter(self) -> Result<AuditLogFilter, String> {
        let source = match self.source.as_deref() {
            None | Some("") => None,
            Some(key) => Some(
                ScrapeSource::parse(key).ok_or_else(|| format!("Invalid source filter '{}'", key))?,
            ),
        };
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(s) => Some(
                RunLogStatus::parse(s).ok_or_else(|| format!("Invalid status filter '{}'", s))?,
            ),
        };
        let limit = match self.limit.as_deref() {
            None | Some("") => AuditLogFilter::DEFAULT_LIMIT,
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| format!("Invalid limit '{}'", s))?,
        };
        Ok(AuditLogFilter {
            source,
            status,
            limit,
        })
    }
}

async fn get_logs(
    _admin: AdminAccess,
    State(orchestrator): State<Orchestrator>,
    Query(query): Query<LogsQuery>,
) -> Response {
    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    match orchestrator.logs(&filter) {
        Ok(logs) => Json(json!({
            "success": true,
            "count": logs.len(),
            "data": logs,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to query scrape logs: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to query logs")
        }
    }
}

async fn delete_source_data(
    _admin: AdminAccess,
    State(record_store): State<GuardedRecordStore>,
    Path(key): Path<String>,
) -> Response {
    let Some(source) = ScrapeSource::parse(&key) else {
        return error_response(StatusCode::BAD_REQUEST, format!("Unknown source '{}'", key));
    };

    match record_store.delete_records(source) {
        Ok(deleted) => {
            info!("Deleted {} {} records via admin API", deleted, source);
            Json(json!({
                "success": true,
                "source": source,
                "deleted": deleted,
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to delete {} records: {:#}", source, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete records")
        }
    }
}

pub fn make_admin_routes(state: ServerState) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/scrape/{source}", post(trigger_scrape))
        .route("/stop", post(stop_scrape))
        .route("/logs", get(get_logs))
        .route("/data/{source}", delete(delete_source_data))
        .with_state(state)
}

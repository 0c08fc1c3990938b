use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use super::admin_key::ADMIN_KEY_HEADER;
use super::admin_routes::make_admin_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};
use crate::scraping::Orchestrator;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

pub(super) fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

fn make_cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let origin = match allowed_origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid allowed origin: {}", origin))?,
        ),
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(ADMIN_KEY_HEADER),
        ]))
}

pub fn make_app(
    config: ServerConfig,
    orchestrator: Orchestrator,
    record_store: GuardedRecordStore,
) -> Result<Router> {
    let cors = make_cors_layer(config.allowed_origin.as_deref())?;
    let state = ServerState {
        config,
        start_time: Instant::now(),
        orchestrator,
        record_store,
        hash: env!("GIT_HASH").to_string(),
    };

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    let app: Router = home_router
        .nest("/api/admin", make_admin_routes(state.clone()))
        .layer(middleware::from_fn_with_state(state, log_requests))
        .layer(cors);

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serve the admin API on `config.port` and metrics on `metrics_port` until
/// `shutdown` is cancelled.
pub async fn run_server(
    config: ServerConfig,
    orchestrator: Orchestrator,
    record_store: GuardedRecordStore,
    metrics_port: u16,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, orchestrator, record_store)?;

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let main_server =
        axum::serve(listener, app).with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let metrics_server = axum::serve(metrics_listener, make_metrics_app())
        .with_graceful_shutdown(shutdown.cancelled_owned());

    tokio::try_join!(
        async { main_server.await.context("HTTP server failed") },
        async { metrics_server.await.context("Metrics server failed") },
    )?;
    Ok(())
}

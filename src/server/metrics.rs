use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all scraper metrics
const PREFIX: &str = "riyada_scraper";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Scrape Run Metrics
    pub static ref SCRAPE_RUNS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_runs_total"), "Finished scrape runs by outcome"),
        &["source", "status"]
    ).expect("Failed to create runs_total metric");

    pub static ref SCRAPE_RUN_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_run_duration_seconds"),
            "Scrape run duration in seconds"
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 1800.0]),
        &["source"]
    ).expect("Failed to create run_duration_seconds metric");

    pub static ref SCRAPE_RUNNING: GaugeVec = GaugeVec::new(
        Opts::new(format!("{PREFIX}_running"), "Whether a source is currently being scraped (1) or not (0)"),
        &["source"]
    ).expect("Failed to create running metric");

    pub static ref SCRAPE_RUNS_SKIPPED_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_runs_skipped_total"), "Runs skipped because the source was already running"),
        &["source"]
    ).expect("Failed to create runs_skipped_total metric");

    pub static ref SCRAPE_RECORDS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_records_total"), "Records processed by successful runs"),
        &["source", "kind"]
    ).expect("Failed to create records_total metric");

    pub static ref AUDIT_SINK_ERRORS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_audit_sink_errors_total"),
        "Audit log entries that could not be written"
    ).expect("Failed to create audit_sink_errors_total metric");
}

/// Register every metric with [`REGISTRY`]. Safe to call more than once.
pub fn init_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(SCRAPE_RUNS_TOTAL.clone()),
        Box::new(SCRAPE_RUN_DURATION_SECONDS.clone()),
        Box::new(SCRAPE_RUNNING.clone()),
        Box::new(SCRAPE_RUNS_SKIPPED_TOTAL.clone()),
        Box::new(SCRAPE_RECORDS_TOTAL.clone()),
        Box::new(AUDIT_SINK_ERRORS_TOTAL.clone()),
    ];
    for collector in collectors {
        // AlreadyReg on repeated calls
        let _ = REGISTRY.register(collector);
    }

    tracing::info!("Metrics registered");
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn set_scrape_running(source: &str, running: bool) {
    SCRAPE_RUNNING
        .with_label_values(&[source])
        .set(if running { 1.0 } else { 0.0 });
}

/// Record a finished run, `status` is "success" or "error"
pub fn record_scrape_run(source: &str, status: &str, duration: Duration) {
    SCRAPE_RUNS_TOTAL.with_label_values(&[source, status]).inc();
    SCRAPE_RUN_DURATION_SECONDS
        .with_label_values(&[source])
        .observe(duration.as_secs_f64());
}

pub fn record_scrape_records(source: &str, new: u64, updated: u64, errored: u64) {
    SCRAPE_RECORDS_TOTAL
        .with_label_values(&[source, "new"])
        .inc_by(new as f64);
    SCRAPE_RECORDS_TOTAL
        .with_label_values(&[source, "updated"])
        .inc_by(updated as f64);
    SCRAPE_RECORDS_TOTAL
        .with_label_values(&[source, "errored"])
        .inc_by(errored as f64);
}

pub fn record_scrape_skipped(source: &str) {
    SCRAPE_RUNS_SKIPPED_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_audit_sink_error() {
    AUDIT_SINK_ERRORS_TOTAL.inc();
}

/// Prometheus text exposition of [`REGISTRY`].
pub async fn metrics_handler() -> impl IntoResponse {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        );
    }
    (StatusCode::OK, String::from_utf8_lossy(&buffer).into_owned())
}

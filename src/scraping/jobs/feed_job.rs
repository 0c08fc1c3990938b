//! Generic JSON feed job.
//!
//! Fetches one URL and upserts every item of the feed keyed by its `id`.
//! Accepted shapes are a top-level array or an object with a `data` array.

use crate::config::FeedSourceSettings;
use crate::scrape_store::{RecordStore, UpsertOutcome};
use crate::scraping::{JobError, RunStats, ScrapeJob, ScrapeSource};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct FeedScrapeJob {
    source: ScrapeSource,
    label: String,
    url: String,
    client: reqwest::Client,
    record_store: Arc<dyn RecordStore>,
}

impl FeedScrapeJob {
    pub fn new(
        settings: &FeedSourceSettings,
        record_store: Arc<dyn RecordStore>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_sec))
            .user_agent(concat!("riyada-scraper/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            source: settings.source,
            label: settings
                .label
                .clone()
                .unwrap_or_else(|| settings.source.default_label().to_string()),
            url: settings.url.clone(),
            client,
            record_store,
        })
    }

    async fn fetch(&self) -> Result<Value, JobError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| JobError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Fetch(format!("HTTP {} from {}", status, self.url)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| JobError::InvalidPayload(e.to_string()))
    }
}

fn feed_items(body: Value) -> Result<Vec<Value>, JobError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(JobError::InvalidPayload(
                "expected a `data` array in the feed object".to_string(),
            )),
        },
        _ => Err(JobError::InvalidPayload(
            "expected an array or an object".to_string(),
        )),
    }
}

/// Items are keyed by a string or integer `id`.
fn external_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl ScrapeJob for FeedScrapeJob {
    fn source(&self) -> ScrapeSource {
        self.source
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn run(&self) -> Result<RunStats, JobError> {
        let start = Instant::now();
        let items = feed_items(self.fetch().await?)?;
        debug!("{}: {} item(s) in feed", self.label, items.len());

        // SQLite writes block, keep them off the async workers
        let source = self.source;
        let label = self.label.clone();
        let record_store = Arc::clone(&self.record_store);
        let mut stats = tokio::task::spawn_blocking(move || {
            store_items(record_store.as_ref(), source, &label, &items)
        })
        .await
        .map_err(|e| JobError::ExecutionFailed(format!("Storing records failed: {}", e)))?;

        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }
}

/// Upsert every item, counting outcomes. Never fails as a whole.
fn store_items(
    record_store: &dyn RecordStore,
    source: ScrapeSource,
    label: &str,
    items: &[Value],
) -> RunStats {
    let mut stats = RunStats::default();
    for item in items {
        let Some(id) = external_id(item) else {
            stats.records_errored += 1;
            continue;
        };
        match record_store.upsert_record(source, &id, item) {
            Ok(UpsertOutcome::Inserted) => stats.records_new += 1,
            Ok(UpsertOutcome::Updated) => stats.records_updated += 1,
            Ok(UpsertOutcome::Unchanged) => {}
            Err(e) => {
                warn!("{}: failed to store item {}: {:#}", label, id, e);
                stats.records_errored += 1;
            }
        }
    }
    stats
}

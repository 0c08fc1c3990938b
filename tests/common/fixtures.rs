//! Stub scrape jobs
//!
//! The e2e tests never reach the network; every source is served by a
//! `StubJob` whose result is fixed up front.

use super::constants::*;
use async_trait::async_trait;
use riyada_scraper_server::scraping::{JobCatalog, JobError, RunStats, ScrapeJob, ScrapeSource};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

enum StubResult {
    Success(RunStats),
    Failure(String),
}

pub struct StubJob {
    source: ScrapeSource,
    result: StubResult,
    gate: Option<Arc<Notify>>,
    runs: AtomicUsize,
}

impl StubJob {
    pub fn succeeding(source: ScrapeSource, records_new: u64) -> Self {
        Self {
            source,
            result: StubResult::Success(RunStats {
                records_new,
                duration_ms: 1,
                ..Default::default()
            }),
            gate: None,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn failing(source: ScrapeSource, message: &str) -> Self {
        Self {
            result: StubResult::Failure(message.to_string()),
            ..Self::succeeding(source, 0)
        }
    }

    /// Holds the run open until `gate` is notified.
    #[allow(dead_code)]
    pub fn gated(self, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..self
        }
    }

    #[allow(dead_code)]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScrapeJob for StubJob {
    fn source(&self) -> ScrapeSource {
        self.source
    }

    async fn run(&self) -> Result<RunStats, JobError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match &self.result {
            StubResult::Success(stats) => Ok(stats.clone()),
            StubResult::Failure(message) => Err(JobError::Fetch(message.clone())),
        }
    }
}

/// Franchise and support succeed, doroob fails.
pub fn default_catalog() -> JobCatalog {
    JobCatalog::new()
        .with_job(Arc::new(StubJob::succeeding(
            ScrapeSource::Franchise,
            FRANCHISE_NEW_RECORDS,
        )))
        .and_then(|c| {
            c.with_job(Arc::new(StubJob::failing(
                ScrapeSource::Doroob,
                DOROOB_FAILURE,
            )))
        })
        .and_then(|c| {
            c.with_job(Arc::new(StubJob::succeeding(
                ScrapeSource::Support,
                SUPPORT_NEW_RECORDS,
            )))
        })
        .expect("Failed to build test catalog")
}

use super::ScrapeSource;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Counters reported by a successful scrape run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub records_new: u64,
    pub records_updated: u64,
    pub records_errored: u64,
    /// Time the job measured for itself.
    pub duration_ms: u64,
}

/// Errors a scrape job can report.
///
/// The `Display` text is what ends up in the run status and the audit log.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// A fetch-and-upsert job for one data source.
///
/// Jobs run on the tokio runtime in their own task. They must settle in finite
/// time and must never touch the run status registry; the orchestrator owns it.
#[async_trait]
pub trait ScrapeJob: Send + Sync {
    /// Source this job feeds.
    fn source(&self) -> ScrapeSource;

    /// Human-readable name, used in logs.
    fn label(&self) -> &str {
        self.source().default_label()
    }

    /// Fetch the source and upsert its records.
    async fn run(&self) -> Result<RunStats, JobError>;
}

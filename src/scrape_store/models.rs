use crate::scraping::{RunStats, ScrapeSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome recorded for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLogStatus {
    Success,
    Error,
}

impl RunLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunLogStatus::Success => "success",
            RunLogStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RunLogStatus::Success),
            "error" => Some(RunLogStatus::Error),
            _ => None,
        }
    }
}

/// One audit record per execution attempt, written when the attempt completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub source: ScrapeSource,
    pub status: RunLogStatus,
    pub records_new: u64,
    pub records_updated: u64,
    pub records_errored: u64,
    pub duration_ms: u64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Wall-clock length of an attempt, as measured by whoever ran it.
fn elapsed_ms(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> u64 {
    (finished_at - started_at).num_milliseconds().max(0) as u64
}

impl AuditLogEntry {
    /// Counters come from the job, the duration from the two timestamps.
    pub fn success(
        source: ScrapeSource,
        stats: &RunStats,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            status: RunLogStatus::Success,
            records_new: stats.records_new,
            records_updated: stats.records_updated,
            records_errored: stats.records_errored,
            duration_ms: elapsed_ms(started_at, finished_at),
            error_message: None,
            started_at,
            finished_at,
        }
    }

    /// Failed runs carry zero counters and the wall-clock time of the attempt.
    pub fn failure(
        source: ScrapeSource,
        message: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            status: RunLogStatus::Error,
            records_new: 0,
            records_updated: 0,
            records_errored: 0,
            duration_ms: elapsed_ms(started_at, finished_at),
            error_message: Some(message.into()),
            started_at,
            finished_at,
        }
    }
}

/// An audit entry as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedAuditEntry {
    pub id: i64,
    #[serde(flatten)]
    pub entry: AuditLogEntry,
}

/// Exact-match filter for audit queries. Results are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogFilter {
    pub source: Option<ScrapeSource>,
    pub status: Option<RunLogStatus>,
    pub limit: usize,
}

impl AuditLogFilter {
    pub const DEFAULT_LIMIT: usize = 50;
    pub const MAX_LIMIT: usize = 500;

    pub fn recent(limit: usize) -> Self {
        Self {
            source: None,
            status: None,
            limit,
        }
    }
}

impl Default for AuditLogFilter {
    fn default() -> Self {
        Self::recent(Self::DEFAULT_LIMIT)
    }
}

/// What an upsert did to the stored copy of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// Payload hash matched the stored one.
    Unchanged,
}

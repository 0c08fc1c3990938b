//! Turns finished runs into audit log entries.

use super::{RunOutcome, ScrapeSource};
use crate::scrape_store::{AuditLogEntry, ScrapeLogStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct ScrapeAuditLogger {
    store: Arc<dyn ScrapeLogStore>,
}

impl ScrapeAuditLogger {
    pub fn new(store: Arc<dyn ScrapeLogStore>) -> Self {
        Self { store }
    }

    /// Append the entry for one finished attempt, returning its id.
    pub fn record(
        &self,
        source: ScrapeSource,
        outcome: &RunOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Result<i64> {
        let entry = match outcome {
            RunOutcome::Success(stats) => {
                AuditLogEntry::success(source, stats, started_at, finished_at)
            }
            RunOutcome::Failure(message) => {
                AuditLogEntry::failure(source, message.as_str(), started_at, finished_at)
            }
        };
        self.store.append_audit_entry(&entry)
    }
}

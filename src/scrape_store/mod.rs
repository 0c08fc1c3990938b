mod models;
mod schema;
mod sqlite_scrape_store;

pub use models::*;
pub use schema::SCRAPER_VERSIONED_SCHEMAS;
pub use sqlite_scrape_store::SqliteScrapeStore;

use crate::scraping::ScrapeSource;
use anyhow::Result;

/// Append-only sink for run outcomes.
pub trait ScrapeLogStore: Send + Sync {
    /// Persist one entry and return its store-assigned id.
    fn append_audit_entry(&self, entry: &AuditLogEntry) -> Result<i64>;

    /// Entries matching the filter, newest first.
    fn query_audit_log(&self, filter: &AuditLogFilter) -> Result<Vec<LoggedAuditEntry>>;
}

/// Storage for the records the scrape jobs bring in.
pub trait RecordStore: Send + Sync {
    fn upsert_record(
        &self,
        source: ScrapeSource,
        external_id: &str,
        payload: &serde_json::Value,
    ) -> Result<UpsertOutcome>;

    fn count_records(&self, source: ScrapeSource) -> Result<usize>;

    /// Remove every record of a source, returns how many were deleted.
    fn delete_records(&self, source: ScrapeSource) -> Result<usize>;
}

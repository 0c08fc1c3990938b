//! Scrape orchestration: which source may run, running it off the caller's
//! path, and keeping the run status and audit trail in step.

mod audit_logger;
mod catalog;
mod job;
pub mod jobs;
mod orchestrator;
mod registry;
mod scheduler;
mod source;

pub use audit_logger::ScrapeAuditLogger;
pub use catalog::JobCatalog;
pub use job::{JobError, RunStats, ScrapeJob};
pub use orchestrator::{
    BatchReport, Orchestrator, ScrapeError, SourceRunOutcome, SourceRunResult, StatusSnapshot,
    StopAck, TriggerAck,
};
pub use registry::{RunGuard, RunOutcome, RunStatus, RunStatusRegistry, ABANDONED_RUN_MESSAGE};
pub use scheduler::{needs_initial_scrape, ScrapeScheduler, INITIAL_SCRAPE_DELAY};
pub use source::{ScrapeSource, SourceSelector, ALL_SOURCES_KEY};

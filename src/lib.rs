//! Riyada Scraper Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod scrape_store;
pub mod scraping;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use scrape_store::{RecordStore, ScrapeLogStore, SqliteScrapeStore};
pub use scraping::{JobCatalog, Orchestrator, ScrapeJob, ScrapeSource};
pub use server::{run_server, RequestsLoggingLevel};

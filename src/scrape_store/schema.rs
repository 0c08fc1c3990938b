//! SQLite schema definitions for the scraper database.

use crate::sqlite_column;
use crate::sqlite_persistence::{SqlType, Table, VersionedSchema};
use anyhow::Result;
use rusqlite::Connection;

// =============================================================================
// Version 1 - Run audit log
// =============================================================================

/// One row per scrape attempt, never updated
const SCRAPE_LOG_TABLE_V1: Table = Table {
    name: "scrape_log",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Text, non_null = true),
        sqlite_column!("records_new", &SqlType::Integer, non_null = true),
        sqlite_column!("records_updated", &SqlType::Integer, non_null = true),
        sqlite_column!("records_errored", &SqlType::Integer, non_null = true),
        sqlite_column!("duration_ms", &SqlType::Integer, non_null = true),
        sqlite_column!("error_message", &SqlType::Text),
        sqlite_column!("started_at", &SqlType::Text, non_null = true),
        sqlite_column!("finished_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_scrape_log_source", "source"),
        ("idx_scrape_log_status", "status"),
    ],
    unique_constraints: &[],
};

// =============================================================================
// Version 2 - Scraped records
// =============================================================================

const SCRAPED_RECORDS_TABLE_V2: Table = Table {
    name: "scraped_records",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("external_id", &SqlType::Text, non_null = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true),
        sqlite_column!("content_hash", &SqlType::Text, non_null = true),
        sqlite_column!("first_seen_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_scraped_records_source", "source")],
    unique_constraints: &[&["source", "external_id"]],
};

fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    SCRAPED_RECORDS_TABLE_V2.create(conn)
}

pub static SCRAPER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 1,
        tables: &[SCRAPE_LOG_TABLE_V1],
        migration: None,
    },
    VersionedSchema {
        version: 2,
        tables: &[SCRAPE_LOG_TABLE_V1, SCRAPED_RECORDS_TABLE_V2],
        migration: Some(migrate_v1_to_v2),
    },
];

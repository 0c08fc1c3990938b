use super::models::{AuditLogEntry, AuditLogFilter, LoggedAuditEntry, RunLogStatus, UpsertOutcome};
use super::schema::SCRAPER_VERSIONED_SCHEMAS;
use super::{RecordStore, ScrapeLogStore};
use crate::scraping::ScrapeSource;
use crate::sqlite_persistence::open_versioned;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};

const AUDIT_COLUMNS: &str = "id, source, status, records_new, records_updated, records_errored, \
     duration_ms, error_message, started_at, finished_at";

#[derive(Clone)]
pub struct SqliteScrapeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteScrapeStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = open_versioned(db_path, SCRAPER_VERSIONED_SCHEMAS, "scraper")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339()
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn content_hash(payload: &str) -> String {
        format!("{:x}", Sha256::digest(payload.as_bytes()))
    }

    fn row_to_audit_entry(row: &rusqlite::Row) -> rusqlite::Result<LoggedAuditEntry> {
        let source_str: String = row.get("source")?;
        let source = ScrapeSource::parse(&source_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Text,
                format!("unknown source '{}'", source_str).into(),
            )
        })?;
        let status_str: String = row.get("status")?;
        let status = RunLogStatus::parse(&status_str).unwrap_or(RunLogStatus::Error);

        let started_at: String = row.get("started_at")?;
        let finished_at: String = row.get("finished_at")?;

        Ok(LoggedAuditEntry {
            id: row.get("id")?,
            entry: AuditLogEntry {
                source,
                status,
                records_new: row.get::<_, i64>("records_new")? as u64,
                records_updated: row.get::<_, i64>("records_updated")? as u64,
                records_errored: row.get::<_, i64>("records_errored")? as u64,
                duration_ms: row.get::<_, i64>("duration_ms")? as u64,
                error_message: row.get("error_message")?,
                started_at: Self::parse_datetime(&started_at),
                finished_at: Self::parse_datetime(&finished_at),
            },
        })
    }
}

impl ScrapeLogStore for SqliteScrapeStore {
    fn append_audit_entry(&self, entry: &AuditLogEntry) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO scrape_log (source, status, records_new, records_updated, records_errored,
                                     duration_ms, error_message, started_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.source.as_str(),
                entry.status.as_str(),
                entry.records_new as i64,
                entry.records_updated as i64,
                entry.records_errored as i64,
                entry.duration_ms as i64,
                entry.error_message,
                Self::format_datetime(&entry.started_at),
                Self::format_datetime(&entry.finished_at),
            ],
        )
        .context("Failed to append scrape log entry")?;

        Ok(conn.last_insert_rowid())
    }

    fn query_audit_log(&self, filter: &AuditLogFilter) -> Result<Vec<LoggedAuditEntry>> {
        let mut sql = format!("SELECT {} FROM scrape_log WHERE 1=1", AUDIT_COLUMNS);
        let mut args: Vec<Value> = Vec::new();
        if let Some(source) = filter.source {
            args.push(Value::Text(source.as_str().to_string()));
            sql.push_str(&format!(" AND source = ?{}", args.len()));
        }
        if let Some(status) = filter.status {
            args.push(Value::Text(status.as_str().to_string()));
            sql.push_str(&format!(" AND status = ?{}", args.len()));
        }
        args.push(Value::Integer(filter.limit as i64));
        // ids are AUTOINCREMENT, so they follow insertion order even when clocks don't
        sql.push_str(&format!(" ORDER BY id DESC LIMIT ?{}", args.len()));

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(args), Self::row_to_audit_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }
}

impl RecordStore for SqliteScrapeStore {
    fn upsert_record(
        &self,
        source: ScrapeSource,
        external_id: &str,
        payload: &serde_json::Value,
    ) -> Result<UpsertOutcome> {
        let payload_str = payload.to_string();
        let hash = Self::content_hash(&payload_str);
        let now = Self::format_datetime(&Utc::now());

        let conn = self.conn.lock().unwrap();
        let existing: Option<String> = conn
            .query_row(
                "SELECT content_hash FROM scraped_records WHERE source = ?1 AND external_id = ?2",
                params![source.as_str(), external_id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            None => {
                conn.execute(
                    "INSERT INTO scraped_records (source, external_id, payload, content_hash,
                                                  first_seen_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![source.as_str(), external_id, payload_str, hash, now],
                )?;
                Ok(UpsertOutcome::Inserted)
            }
            Some(existing_hash) if existing_hash == hash => Ok(UpsertOutcome::Unchanged),
            Some(_) => {
                conn.execute(
                    "UPDATE scraped_records SET payload = ?1, content_hash = ?2, updated_at = ?3
                     WHERE source = ?4 AND external_id = ?5",
                    params![payload_str, hash, now, source.as_str(), external_id],
                )?;
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    fn count_records(&self, source: ScrapeSource) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM scraped_records WHERE source = ?1",
            params![source.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn delete_records(&self, source: ScrapeSource) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM scraped_records WHERE source = ?1",
            params![source.as_str()],
        )?;
        Ok(deleted)
    }
}

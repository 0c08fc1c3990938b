mod file_config;

pub use file_config::{FileConfig, SourceConfig};

use crate::scraping::{Orchestrator, ScrapeSource};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;

/// Command line values, the base layer under the TOML file.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub admin_api_key: Option<String>,
    pub scrape_interval_hours: u64,
    pub force_initial_scrape: bool,
    pub allowed_origin: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Shared secret of the admin routes. Without it every admin request is refused.
    pub admin_api_key: Option<String>,
    pub allowed_origin: Option<String>,

    pub scrape_interval_hours: u64,
    pub force_initial_scrape: bool,
    pub recent_logs_limit: usize,
    pub sources: Vec<FeedSourceSettings>,
}

/// Where and how to fetch one source's feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSourceSettings {
    pub source: ScrapeSource,
    pub url: String,
    pub label: Option<String>,
    pub timeout_sec: u64,
}

impl FeedSourceSettings {
    pub const DEFAULT_TIMEOUT_SEC: u64 = 30;
}

impl AppConfig {
    /// Merge the command line with the optional TOML file, the file winning on
    /// every key it sets. Fails on a missing database directory or a bad
    /// `[sources]` table.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or db_dir in the config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory {:?} does not exist", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("Database directory {:?} is not a directory", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        // An empty key is the same as no key.
        let admin_api_key = file
            .admin_api_key
            .or_else(|| cli.admin_api_key.clone())
            .filter(|key| !key.is_empty());
        let allowed_origin = file
            .allowed_origin
            .or_else(|| cli.allowed_origin.clone());

        let scrape_interval_hours = file
            .scrape_interval_hours
            .unwrap_or(cli.scrape_interval_hours);
        let force_initial_scrape = file
            .force_initial_scrape
            .unwrap_or(cli.force_initial_scrape);
        let recent_logs_limit = file
            .recent_logs_limit
            .unwrap_or(Orchestrator::DEFAULT_RECENT_LOGS);

        let mut sources = Vec::with_capacity(file.sources.len());
        for (key, source_file) in file.sources {
            let Some(source) = ScrapeSource::parse(&key) else {
                bail!("Unknown source '{}' in [sources] config", key);
            };
            let Some(url) = source_file.url.filter(|url| !url.is_empty()) else {
                bail!("Source '{}' has no url", key);
            };
            sources.push(FeedSourceSettings {
                source,
                url,
                label: source_file.label,
                timeout_sec: source_file
                    .timeout_sec
                    .unwrap_or(FeedSourceSettings::DEFAULT_TIMEOUT_SEC),
            });
        }
        // The catalog runs `all` in this order.
        sources.sort_by_key(|s| s.source);

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            admin_api_key,
            allowed_origin,
            scrape_interval_hours,
            force_initial_scrape,
            recent_logs_limit,
            sources,
        })
    }

    pub fn scraper_db_path(&self) -> PathBuf {
        self.db_dir.join("scraper.db")
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}

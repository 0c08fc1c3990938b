use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use riyada_scraper_server::config::{self, AppConfig, FileConfig};
use riyada_scraper_server::scrape_store::{RecordStore, SqliteScrapeStore};
use riyada_scraper_server::scraping::jobs::FeedScrapeJob;
use riyada_scraper_server::scraping::{
    needs_initial_scrape, JobCatalog, Orchestrator, ScrapeScheduler, INITIAL_SCRAPE_DELAY,
};
use riyada_scraper_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    /// Feed sources are only configurable there, under [sources.<key>].
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory containing the scraper.db database file.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Shared secret for the /api/admin routes. Without it every admin request is refused.
    #[clap(long, env = "ADMIN_API_KEY", hide_env_values = true)]
    pub admin_api_key: Option<String>,

    /// Hours between full scrapes. Set to 0 to disable periodic scraping.
    #[clap(long, default_value_t = 24)]
    pub scrape_interval_hours: u64,

    /// Run a full scrape shortly after startup even if records are already stored.
    #[clap(long, env = "FORCE_INITIAL_SCRAPE")]
    pub force_initial_scrape: bool,

    /// CORS origin allowed to call the API. Any origin when unset.
    #[clap(long, env = "ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            admin_api_key: args.admin_api_key.clone(),
            scrape_interval_hours: args.scrape_interval_hours,
            force_initial_scrape: args.force_initial_scrape,
            allowed_origin: args.allowed_origin.clone(),
        }
    }
}

fn build_catalog(app_config: &AppConfig, record_store: Arc<dyn RecordStore>) -> Result<JobCatalog> {
    let mut catalog = JobCatalog::new();
    for settings in &app_config.sources {
        info!("Registering {} feed at {}", settings.source, settings.url);
        let job = FeedScrapeJob::new(settings, Arc::clone(&record_store))
            .with_context(|| format!("Failed to create job for {}", settings.source))?;
        catalog.register(Arc::new(job))?;
    }
    Ok(catalog)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening scraper database at {:?}", app_config.scraper_db_path());
    let store = Arc::new(SqliteScrapeStore::new(app_config.scraper_db_path())?);

    let catalog = build_catalog(&app_config, store.clone())?;
    if catalog.is_empty() {
        warn!("No sources configured, scrape triggers will be rejected");
    }
    let sources = catalog.sources();
    let orchestrator = Orchestrator::new(catalog, store.clone());

    if app_config.admin_api_key.is_none() {
        warn!("No admin API key configured, admin routes are locked");
    }

    let shutdown_token = CancellationToken::new();
    let mut scheduler = ScrapeScheduler::new(
        orchestrator.clone(),
        app_config.scrape_interval_hours,
        shutdown_token.clone(),
    );
    if !sources.is_empty()
        && needs_initial_scrape(store.as_ref(), &sources, app_config.force_initial_scrape)
    {
        info!(
            "Initial scrape scheduled in {:?}",
            INITIAL_SCRAPE_DELAY
        );
        scheduler = scheduler.with_initial_scrape(INITIAL_SCRAPE_DELAY);
    }

    let server_config = ServerConfig::from(&app_config);

    tokio::select! {
        result = run_server(
            server_config,
            orchestrator,
            store,
            app_config.metrics_port,
            shutdown_token.clone(),
        ) => {
            info!("HTTP server stopped: {:?}", result);
            shutdown_token.cancel();
            result
        },
        _ = scheduler.run() => {
            info!("Scheduler stopped");
            Ok(())
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            shutdown_token.cancel();
            // In-flight scrapes are not awaited; give the servers a moment to close
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        }
    }
}

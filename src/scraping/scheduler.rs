use super::{Orchestrator, ScrapeSource, SourceSelector};
use crate::scrape_store::RecordStore;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Pause between startup and the initial scrape, so the HTTP server is up first.
pub const INITIAL_SCRAPE_DELAY: Duration = Duration::from_secs(2);

/// True when an initial scrape should run: forced, or nothing stored yet for
/// any of `sources`.
pub fn needs_initial_scrape(
    record_store: &dyn RecordStore,
    sources: &[ScrapeSource],
    force: bool,
) -> bool {
    if force {
        return true;
    }
    let mut total = 0;
    for source in sources {
        match record_store.count_records(*source) {
            Ok(count) => total += count,
            Err(e) => {
                error!("Failed to count records for {}: {}", source, e);
                return false;
            }
        }
    }
    total == 0
}

/// Periodically fires a full scrape through the orchestrator.
pub struct ScrapeScheduler {
    orchestrator: Orchestrator,
    interval: Option<Duration>,
    initial_delay: Option<Duration>,
    shutdown_token: CancellationToken,
}

impl ScrapeScheduler {
    /// `interval_hours == 0` disables the periodic runs.
    pub fn new(
        orchestrator: Orchestrator,
        interval_hours: u64,
        shutdown_token: CancellationToken,
    ) -> Self {
        let interval = (interval_hours > 0).then(|| Duration::from_secs(interval_hours * 3600));
        Self::with_interval(orchestrator, interval, shutdown_token)
    }

    pub fn with_interval(
        orchestrator: Orchestrator,
        interval: Option<Duration>,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            interval,
            initial_delay: None,
            shutdown_token,
        }
    }

    /// Also run one full scrape `delay` after the scheduler starts.
    pub fn with_initial_scrape(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    pub async fn run(self) {
        if let Some(delay) = self.initial_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    info!("Running initial scrape");
                    self.orchestrator.spawn_run(SourceSelector::All);
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scrape scheduler stopped before the initial scrape");
                    return;
                }
            }
        }

        let Some(interval) = self.interval else {
            info!("Periodic scraping disabled");
            self.shutdown_token.cancelled().await;
            return;
        };

        info!("Scrape scheduler running every {:?}", interval);
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("Scheduled scrape tick");
                    self.orchestrator.spawn_run(SourceSelector::All);
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scrape scheduler received shutdown signal");
                    break;
                }
            }
        }
    }
}

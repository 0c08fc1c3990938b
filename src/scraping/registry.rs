use super::{RunStats, ScrapeSource};
use crate::server::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Message recorded when a guard goes away without an explicit outcome.
pub const ABANDONED_RUN_MESSAGE: &str = "Run ended without reporting an outcome";

/// In-memory state of one source. Reset on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub running: bool,
    pub last_run_started_at: Option<DateTime<Utc>>,
    pub last_stats: Option<RunStats>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success(RunStats),
    Failure(String),
}

/// Process-wide table of per-source run state.
///
/// `try_acquire` is the only way to flip a source to running, and the returned
/// guard is the only way to flip it back.
#[derive(Clone, Default)]
pub struct RunStatusRegistry {
    statuses: Arc<Mutex<BTreeMap<ScrapeSource, RunStatus>>>,
}

impl RunStatusRegistry {
    /// Registry with an idle entry for each of `sources`.
    pub fn new(sources: impl IntoIterator<Item = ScrapeSource>) -> Self {
        let statuses = sources
            .into_iter()
            .map(|source| (source, RunStatus::default()))
            .collect();
        Self {
            statuses: Arc::new(Mutex::new(statuses)),
        }
    }

    // Every critical section leaves the map consistent, poisoned or not.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<ScrapeSource, RunStatus>> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, source: ScrapeSource) -> Option<RunStatus> {
        self.lock().get(&source).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<ScrapeSource, RunStatus> {
        self.lock().clone()
    }

    pub fn running_sources(&self) -> Vec<ScrapeSource> {
        self.lock()
            .iter()
            .filter(|(_, status)| status.running)
            .map(|(source, _)| *source)
            .collect()
    }

    /// Atomically mark `source` as running.
    ///
    /// Returns `None` when it already is. On success `last_run_started_at` is set
    /// to now and `last_error` is cleared; `last_stats` keeps the previous value.
    pub fn try_acquire(&self, source: ScrapeSource) -> Option<RunGuard> {
        let mut statuses = self.lock();
        let status = statuses.entry(source).or_default();
        if status.running {
            return None;
        }
        status.running = true;
        status.last_run_started_at = Some(Utc::now());
        status.last_error = None;
        drop(statuses);

        metrics::set_scrape_running(source.as_str(), true);
        Some(RunGuard {
            registry: self.clone(),
            source,
            released: false,
        })
    }

    fn finish(&self, source: ScrapeSource, outcome: RunOutcome) {
        {
            let mut statuses = self.lock();
            let status = statuses.entry(source).or_default();
            status.running = false;
            match outcome {
                RunOutcome::Success(stats) => status.last_stats = Some(stats),
                RunOutcome::Failure(message) => status.last_error = Some(message),
            }
        }
        metrics::set_scrape_running(source.as_str(), false);
    }
}

/// Exclusive right to run one source, handed out by [`RunStatusRegistry::try_acquire`].
///
/// Releasing consumes the guard. Dropping it unreleased records a failure, so
/// the source never stays stuck in the running state.
#[must_use = "dropping the guard releases the source with a failure"]
pub struct RunGuard {
    registry: RunStatusRegistry,
    source: ScrapeSource,
    released: bool,
}

impl RunGuard {
    pub fn source(&self) -> ScrapeSource {
        self.source
    }

    pub fn release(mut self, outcome: RunOutcome) {
        self.released = true;
        self.registry.finish(self.source, outcome);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "Run of {} ended without an explicit release, marking it failed",
                self.source
            );
            self.registry
                .finish(self.source, RunOutcome::Failure(ABANDONED_RUN_MESSAGE.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn stats(records_new: u64) -> RunStats {
        RunStats {
            records_new,
            ..Default::default()
        }
    }

    #[test]
    fn seeds_idle_entries() {
        let registry = RunStatusRegistry::new(ScrapeSource::ALL);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.values().all(|s| *s == RunStatus::default()));
        assert!(RunStatusRegistry::default()
            .get(ScrapeSource::Franchise)
            .is_none());
    }

    #[test]
    fn second_acquire_is_refused_until_release() {
        let registry = RunStatusRegistry::new(ScrapeSource::ALL);

        let guard = registry.try_acquire(ScrapeSource::Franchise).unwrap();
        assert!(registry.try_acquire(ScrapeSource::Franchise).is_none());
        // other sources are independent
        let other = registry.try_acquire(ScrapeSource::Doroob).unwrap();

        let status = registry.get(ScrapeSource::Franchise).unwrap();
        assert!(status.running);
        assert!(status.last_run_started_at.is_some());

        guard.release(RunOutcome::Success(stats(5)));
        other.release(RunOutcome::Success(stats(1)));

        let status = registry.get(ScrapeSource::Franchise).unwrap();
        assert!(!status.running);
        assert_eq!(status.last_stats, Some(stats(5)));
        assert!(registry.try_acquire(ScrapeSource::Franchise).is_some());
    }

    #[test]
    fn failure_keeps_previous_stats() {
        let registry = RunStatusRegistry::new([ScrapeSource::Support]);

        registry
            .try_acquire(ScrapeSource::Support)
            .unwrap()
            .release(RunOutcome::Success(stats(3)));
        registry
            .try_acquire(ScrapeSource::Support)
            .unwrap()
            .release(RunOutcome::Failure("timeout".to_string()));

        let status = registry.get(ScrapeSource::Support).unwrap();
        assert!(!status.running);
        assert_eq!(status.last_stats, Some(stats(3)));
        assert_eq!(status.last_error.as_deref(), Some("timeout"));
    }

    #[test]
    fn acquire_clears_last_error() {
        let registry = RunStatusRegistry::new([ScrapeSource::Support]);
        registry
            .try_acquire(ScrapeSource::Support)
            .unwrap()
            .release(RunOutcome::Failure("boom".to_string()));

        let _guard = registry.try_acquire(ScrapeSource::Support).unwrap();

        assert!(registry
            .get(ScrapeSource::Support)
            .unwrap()
            .last_error
            .is_none());
    }

    #[test]
    fn dropped_guard_releases_with_failure() {
        let registry = RunStatusRegistry::new([ScrapeSource::Doroob]);

        {
            let _guard = registry.try_acquire(ScrapeSource::Doroob).unwrap();
        }

        let status = registry.get(ScrapeSource::Doroob).unwrap();
        assert!(!status.running);
        assert_eq!(status.last_error.as_deref(), Some(ABANDONED_RUN_MESSAGE));
    }

    #[test]
    fn unknown_source_entry_is_created_lazily() {
        let registry = RunStatusRegistry::new([ScrapeSource::Franchise]);
        assert!(registry.get(ScrapeSource::Support).is_none());

        let guard = registry.try_acquire(ScrapeSource::Support).unwrap();
        assert!(registry.get(ScrapeSource::Support).unwrap().running);
        assert_eq!(registry.running_sources(), vec![ScrapeSource::Support]);
        guard.release(RunOutcome::Success(RunStats::default()));
        assert!(registry.running_sources().is_empty());
    }

    #[test]
    fn concurrent_acquire_admits_exactly_one() {
        let registry = RunStatusRegistry::new([ScrapeSource::Franchise]);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.try_acquire(ScrapeSource::Franchise))
            })
            .collect();
        let guards: Vec<RunGuard> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(guards.len(), 1);
    }
}

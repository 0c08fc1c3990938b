use super::{
    JobCatalog, RunGuard, RunOutcome, RunStats, RunStatus, RunStatusRegistry, ScrapeAuditLogger,
    ScrapeJob, ScrapeSource, SourceSelector,
};
use crate::scrape_store::{AuditLogFilter, LoggedAuditEntry, ScrapeLogStore};
use crate::server::metrics;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Unknown source '{0}'")]
    UnknownSource(String),

    #[error("Failed to write audit entry for {failed_source}: {message}")]
    AuditSink {
        failed_source: ScrapeSource,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SourceRunOutcome {
    Completed { stats: RunStats },
    Failed { error: String },
    /// Another run of the source held the registry entry.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRunResult {
    pub source: ScrapeSource,
    #[serde(flatten)]
    pub outcome: SourceRunOutcome,
}

/// Per-source results of one `run`, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub results: Vec<SourceRunResult>,
}

impl BatchReport {
    pub fn get(&self, source: ScrapeSource) -> Option<&SourceRunOutcome> {
        self.results
            .iter()
            .find(|r| r.source == source)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&SourceRunOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Returned by `trigger` once the runs are scheduled, long before they finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerAck {
    pub selector: String,
    pub sources: Vec<ScrapeSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StopAck {
    /// Always false: admitted runs are never interrupted.
    pub interrupted: bool,
    pub running: Vec<ScrapeSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub scraping: BTreeMap<ScrapeSource, RunStatus>,
    pub recent_logs: Vec<LoggedAuditEntry>,
}

/// Admission, execution and bookkeeping of scrape runs.
///
/// Cloning is cheap; every clone shares the same registry and catalog.
#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<JobCatalog>,
    registry: RunStatusRegistry,
    audit_logger: ScrapeAuditLogger,
    log_store: Arc<dyn ScrapeLogStore>,
}

impl Orchestrator {
    pub const DEFAULT_RECENT_LOGS: usize = 20;

    pub fn new(catalog: JobCatalog, log_store: Arc<dyn ScrapeLogStore>) -> Self {
        let registry = RunStatusRegistry::new(catalog.sources());
        Self {
            catalog: Arc::new(catalog),
            registry,
            audit_logger: ScrapeAuditLogger::new(Arc::clone(&log_store)),
            log_store,
        }
    }

    pub fn catalog(&self) -> &JobCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &RunStatusRegistry {
        &self.registry
    }

    /// Run the selected jobs one after the other and wait for all of them.
    ///
    /// A failing or panicking job is recorded and the batch moves on. The only
    /// errors are an unknown source, raised before anything runs, and an audit
    /// write fault, raised after the whole batch ran.
    pub async fn run(&self, selector: SourceSelector) -> Result<BatchReport, ScrapeError> {
        let jobs = self.catalog.resolve(selector)?;
        let batch_id = Uuid::new_v4();
        info!(
            "Scrape batch {} started for '{}' ({} job(s))",
            batch_id,
            selector,
            jobs.len()
        );

        let mut report = BatchReport::default();
        let mut first_sink_error = None;

        for job in jobs {
            let source = job.source();
            let Some(guard) = self.registry.try_acquire(source) else {
                info!("{} already running, skipped", job.label());
                metrics::record_scrape_skipped(source.as_str());
                report.results.push(SourceRunResult {
                    source,
                    outcome: SourceRunOutcome::Skipped,
                });
                continue;
            };

            info!("Scraping {} (batch {})", job.label(), batch_id);
            // The guard moves into a task of its own: cancelling this future
            // must not release a source whose job is still executing.
            let supervisor = tokio::spawn(Self::execute(
                job,
                guard,
                self.audit_logger.clone(),
            ));
            let (outcome, sink_error) = match supervisor.await {
                Ok(done) => done,
                Err(e) => {
                    error!("Supervisor of {} failed: {}", source, e);
                    (RunOutcome::Failure(format!("Task panic: {}", e)), None)
                }
            };

            if let Some(message) = sink_error {
                first_sink_error.get_or_insert(ScrapeError::AuditSink {
                    failed_source: source,
                    message,
                });
            }

            report.results.push(SourceRunResult {
                source,
                outcome: match outcome {
                    RunOutcome::Success(stats) => SourceRunOutcome::Completed { stats },
                    RunOutcome::Failure(error) => SourceRunOutcome::Failed { error },
                },
            });
        }

        info!(
            "Scrape batch {} done: {} completed, {} failed, {} skipped",
            batch_id,
            report.count(|o| matches!(o, SourceRunOutcome::Completed { .. })),
            report.count(|o| matches!(o, SourceRunOutcome::Failed { .. })),
            report.count(|o| matches!(o, SourceRunOutcome::Skipped)),
        );

        match first_sink_error {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Run one admitted job to completion, then release `guard` and append the
    /// audit entry. Returns the outcome and the audit write error, if any.
    async fn execute(
        job: Arc<dyn ScrapeJob>,
        guard: RunGuard,
        audit_logger: ScrapeAuditLogger,
    ) -> (RunOutcome, Option<String>) {
        let source = job.source();
        let started_at = Utc::now();
        let start_time = Instant::now();

        // Own task, so a panic surfaces here as a JoinError.
        let task_job = Arc::clone(&job);
        let joined = tokio::spawn(async move { task_job.run().await }).await;
        let elapsed = start_time.elapsed();
        let finished_at = Utc::now();

        let outcome = match joined {
            Ok(Ok(stats)) => {
                info!(
                    "{} finished in {:?}: {} new, {} updated, {} errored",
                    job.label(),
                    elapsed,
                    stats.records_new,
                    stats.records_updated,
                    stats.records_errored
                );
                metrics::record_scrape_run(source.as_str(), "success", elapsed);
                metrics::record_scrape_records(
                    source.as_str(),
                    stats.records_new,
                    stats.records_updated,
                    stats.records_errored,
                );
                RunOutcome::Success(stats)
            }
            Ok(Err(e)) => {
                error!("{} failed after {:?}: {}", job.label(), elapsed, e);
                metrics::record_scrape_run(source.as_str(), "error", elapsed);
                RunOutcome::Failure(e.to_string())
            }
            Err(e) => {
                error!("{} panicked after {:?}: {}", job.label(), elapsed, e);
                metrics::record_scrape_run(source.as_str(), "error", elapsed);
                RunOutcome::Failure(format!("Task panic: {}", e))
            }
        };

        guard.release(outcome.clone());

        let sink_error = match audit_logger.record(source, &outcome, started_at, finished_at) {
            Ok(_) => None,
            Err(e) => {
                error!("Failed to write audit entry for {}: {:#}", source, e);
                metrics::record_audit_sink_error();
                Some(format!("{:#}", e))
            }
        };

        (outcome, sink_error)
    }

    /// Start `run(selector)` in the background and return immediately.
    pub fn spawn_run(&self, selector: SourceSelector) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run(selector).await {
                error!("Scrape batch for '{}' ended with an error: {}", selector, e);
            }
        })
    }

    /// Validate `key` and schedule the run. Never waits for the jobs.
    pub fn trigger(&self, key: &str) -> Result<TriggerAck, ScrapeError> {
        let selector: SourceSelector = key.parse()?;
        let sources = self
            .catalog
            .resolve(selector)?
            .iter()
            .map(|job| job.source())
            .collect();

        self.spawn_run(selector);
        Ok(TriggerAck {
            selector: selector.to_string(),
            sources,
        })
    }

    pub fn status(&self, recent_limit: usize) -> anyhow::Result<StatusSnapshot> {
        Ok(StatusSnapshot {
            scraping: self.registry.snapshot(),
            recent_logs: self
                .log_store
                .query_audit_log(&AuditLogFilter::recent(recent_limit))?,
        })
    }

    /// Acknowledge a stop request. Runs already admitted keep going.
    pub fn request_stop(&self) -> StopAck {
        let running = self.registry.running_sources();
        warn!(
            "Stop requested while {} source(s) running; runs cannot be interrupted",
            running.len()
        );
        StopAck {
            interrupted: false,
            running,
        }
    }

    /// Audit entries, newest first. A zero limit means the default, anything
    /// above the maximum is capped.
    pub fn logs(&self, filter: &AuditLogFilter) -> anyhow::Result<Vec<LoggedAuditEntry>> {
        let limit = match filter.limit {
            0 => AuditLogFilter::DEFAULT_LIMIT,
            n => n.min(AuditLogFilter::MAX_LIMIT),
        };
        self.log_store.query_audit_log(&AuditLogFilter {
            limit,
            ..filter.clone()
        })
    }
}

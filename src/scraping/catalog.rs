use super::{ScrapeError, ScrapeJob, ScrapeSource, SourceSelector};
use std::sync::Arc;

/// The fixed, ordered set of jobs the orchestrator can run.
///
/// Built once at startup. Declaration order is the order `all` runs in.
#[derive(Clone, Default)]
pub struct JobCatalog {
    jobs: Vec<Arc<dyn ScrapeJob>>,
}

impl JobCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job. A second job for the same source is rejected.
    pub fn register(&mut self, job: Arc<dyn ScrapeJob>) -> anyhow::Result<()> {
        let source = job.source();
        if self.get(source).is_some() {
            anyhow::bail!("A job for source '{}' is already registered", source);
        }
        self.jobs.push(job);
        Ok(())
    }

    pub fn with_job(mut self, job: Arc<dyn ScrapeJob>) -> anyhow::Result<Self> {
        self.register(job)?;
        Ok(self)
    }

    pub fn get(&self, source: ScrapeSource) -> Option<&Arc<dyn ScrapeJob>> {
        self.jobs.iter().find(|job| job.source() == source)
    }

    pub fn sources(&self) -> Vec<ScrapeSource> {
        self.jobs.iter().map(|job| job.source()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Expand a selector into the jobs to run, in catalog order.
    ///
    /// A source without a registered job is unknown to this process, the same
    /// as a key that does not parse.
    pub fn resolve(&self, selector: SourceSelector) -> Result<Vec<Arc<dyn ScrapeJob>>, ScrapeError> {
        match selector {
            SourceSelector::All => Ok(self.jobs.clone()),
            SourceSelector::One(source) => self
                .get(source)
                .map(|job| vec![Arc::clone(job)])
                .ok_or_else(|| ScrapeError::UnknownSource(source.as_str().to_string())),
        }
    }
}

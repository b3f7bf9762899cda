//! Job status sink shared between concurrent jobs

use std::collections::HashMap;
use std::sync::RwLock;

use chordsinger_core::{JobId, JobStatus};
use tracing::{info, warn};

/// Where a job reports stage transitions
pub trait StatusStore: Send + Sync {
    fn set(&self, job: &JobId, status: JobStatus);
    fn get(&self, job: &JobId) -> Option<JobStatus>;
}

/// Process-local store behind a read/write lock
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    jobs: RwLock<HashMap<JobId, JobStatus>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|jobs| jobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatusStore for InMemoryStatusStore {
    fn set(&self, job: &JobId, status: JobStatus) {
        info!(
            job = %job,
            stage = %status.stage,
            progress = status.progress,
            "{}",
            status.message
        );
        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(job.clone(), status);
            }
            Err(poisoned) => {
                warn!(job = %job, "Status store lock poisoned, recovering");
                poisoned.into_inner().insert(job.clone(), status);
            }
        }
    }

    fn get(&self, job: &JobId) -> Option<JobStatus> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(job).cloned(),
            Err(poisoned) => poisoned.into_inner().get(job).cloned(),
        }
    }
}

//! One worker thread per job, outcomes over a channel

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chordsinger_core::{JobId, PipelineResult};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error};

use crate::pipeline::{Pipeline, PipelineError};

/// Final result of one job
#[derive(Debug)]
pub struct JobOutcome {
    pub job: JobId,
    pub result: Result<PipelineResult, PipelineError>,
}

pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    outcome_tx: Sender<JobOutcome>,
    outcome_rx: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl JobRunner {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        Self { pipeline, outcome_tx, outcome_rx, workers: Vec::new() }
    }

    /// Start a job on its own thread
    pub fn submit(&mut self, job: JobId, input: PathBuf, output: PathBuf) {
        let pipeline = Arc::clone(&self.pipeline);
        let tx = self.outcome_tx.clone();
        debug!(job = %job, "Submitting job");
        let handle = thread::spawn(move || {
            let result = pipeline.run(&job, &input, &output);
            let _ = tx.send(JobOutcome { job, result });
        });
        self.workers.push(handle);
    }

    /// Wait for every submitted job and collect its outcome.
    pub fn join(self) -> Vec<JobOutcome> {
        let Self { outcome_tx, outcome_rx, workers, .. } = self;
        drop(outcome_tx);
        for worker in workers {
            if worker.join().is_err() {
                error!("Job worker panicked");
            }
        }
        outcome_rx.try_iter().collect()
    }
}

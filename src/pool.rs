//! Bounded pool of concurrent grading runs
//!
//! Each submitted job becomes its own task that owns its inputs and reports
//! back over a channel. A semaphore caps how many runs (and therefore child
//! processes) are active at once. Aborting a task drops its in-flight run,
//! which kills the child's process group.

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::jobs::{process_grade_job, GradeJob, GradeReport};
use crate::runner::{RunLimits, Runner};

pub struct GradingPool {
    runner: Arc<dyn Runner>,
    permits: Arc<Semaphore>,
    default_limits: RunLimits,
    reports: mpsc::UnboundedSender<GradeReport>,
    tasks: JoinSet<()>,
}

impl GradingPool {
    /// Create a pool running at most `max_concurrent` jobs at once.
    ///
    /// Reports arrive on the returned receiver in completion order; it closes
    /// once the pool is dropped and every finished job has reported.
    pub fn new(
        runner: Arc<dyn Runner>,
        max_concurrent: usize,
        default_limits: RunLimits,
    ) -> (Self, mpsc::UnboundedReceiver<GradeReport>) {
        let (reports, receiver) = mpsc::unbounded_channel();
        let pool = Self {
            runner,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            default_limits,
            reports,
            tasks: JoinSet::new(),
        };
        (pool, receiver)
    }

    /// Queue `job`; it starts as soon as a slot is free
    pub fn submit(&mut self, job: GradeJob) {
        self.reap_finished();

        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        let limits = self.default_limits.clone();
        let reports = self.reports.clone();

        self.tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let submission_id = job.submission_id;
            let report = process_grade_job(runner.as_ref(), job, &limits).await;
            info!(
                "Grade job completed: submission_id={}, status={}, passed={}/{}",
                report.submission_id,
                report.status,
                report.test_cases_passed,
                report.total_test_cases
            );
            if reports.send(report).is_err() {
                warn!(
                    "Report receiver dropped; discarding result for submission_id={}",
                    submission_id
                );
            }
        });
    }

    /// Jobs queued or running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every submitted job to finish
    pub async fn join(&mut self) {
        while let Some(res) = self.tasks.join_next().await {
            log_task_failure(res);
        }
    }

    /// Abort every queued and running job, killing their child processes
    pub async fn shutdown(&mut self) {
        let pending = self.tasks.len();
        if pending > 0 {
            warn!("Aborting {} in-flight grade job(s)", pending);
        }
        self.tasks.abort_all();
        while let Some(res) = self.tasks.join_next().await {
            if let Err(e) = &res {
                if e.is_cancelled() {
                    continue;
                }
            }
            log_task_failure(res);
        }
    }

    fn reap_finished(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            log_task_failure(res);
        }
    }
}

fn log_task_failure(res: Result<(), tokio::task::JoinError>) {
    if let Err(e) = res {
        error!("Grade task failed: {}", e);
    }
}

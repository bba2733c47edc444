use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::{debug, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::matcher::SchedulerError;

/// Fixed-size worker pool running a batch of tasks to completion.
///
/// A batch either yields every task's result, in the order the tasks were
/// given, or fails as a whole if a task panics or a task completes later than
/// the timeout after the batch started. Tasks are never cancelled, so a batch
/// returns once all of them have finished.
///
/// Waiting threads steal work of the batch, so a task may itself run a batch
/// on the same scheduler, even with a single thread.
#[derive(Debug)]
pub struct Scheduler {
    pool: ThreadPool,
    timeout: Option<Duration>,
}

impl Scheduler {
    pub fn new(threads: usize, timeout: Option<Duration>) -> Result<Self, SchedulerError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("mapmatch-worker-{index}"))
            .build()
            .map_err(|error| SchedulerError::PoolCreation(error.to_string()))?;

        debug!("created worker pool of {} threads", pool.current_num_threads());
        Ok(Self { pool, timeout })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs the task on every input, returning the results in input order.
    pub fn run<I, R, F>(&self, inputs: Vec<I>, task: F) -> Result<Vec<R>, SchedulerError>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync,
    {
        let expected = inputs.len();
        let started = Instant::now();
        let task = &task;

        let results = self.pool.install(|| {
            inputs
                .into_par_iter()
                .map(|input| {
                    let result = catch_unwind(AssertUnwindSafe(|| task(input)));
                    (result.ok(), started.elapsed())
                })
                .collect::<Vec<_>>()
        });

        if let Some(timeout) = self.timeout {
            let completed = results
                .iter()
                .filter(|(_, elapsed)| *elapsed <= timeout)
                .count();

            if completed < expected {
                let error = SchedulerError::Timeout {
                    completed,
                    expected,
                };
                warn!("{error}");
                return Err(error);
            }
        }

        results
            .into_iter()
            .map(|(result, _)| result.ok_or(SchedulerError::TaskPanicked))
            .collect()
    }
}

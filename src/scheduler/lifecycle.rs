use crate::runtime::context::Context;
use crate::runtime::task::{task_label, NoopMetrics, Task, TaskMetrics};
use crate::scheduler::producer::run_producer;
use crate::scheduler::worker_pool::{handoff_channel, spawn_workers};
use anyhow::{bail, Result};
use std::fmt;
use std::sync::Arc;

/// Interval-driven scheduler running a fixed set of tasks on a bounded pool of
/// workers.
#[derive(Clone)]
pub struct Scheduler {
    tasks: Vec<Arc<dyn Task>>,
    workers: usize,
    metrics: Arc<dyn TaskMetrics>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.tasks.iter().map(|task| task_label(task.as_ref())).collect();
        f.debug_struct("Scheduler")
            .field("tasks", &labels)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Validates every task up front; nothing is spawned until [`Scheduler::start`].
    pub fn new<I>(tasks: I, workers: usize) -> Result<Self>
    where
        I: IntoIterator<Item = Arc<dyn Task>>,
    {
        if workers == 0 {
            bail!("workers must be greater than 0");
        }

        let tasks: Vec<Arc<dyn Task>> = tasks.into_iter().collect();
        for task in &tasks {
            if task.interval().is_zero() {
                bail!("{} interval must be > 0", task_label(task.as_ref()));
            }
        }

        Ok(Self {
            tasks,
            workers,
            metrics: Arc::new(NoopMetrics),
        })
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn TaskMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs every task until `ctx` is done, then shuts down in order: producers
    /// first, then the hand-off queue, then the workers once they drained it.
    ///
    /// Returns only after every spawned producer and worker has exited. Each
    /// call is an independent run.
    pub async fn start(&self, ctx: &Context) {
        tracing::info!(
            tasks = self.tasks.len(),
            workers = self.workers,
            "scheduler starting"
        );

        let (tx, rx) = handoff_channel();
        let workers = spawn_workers(self.workers, rx, ctx, &self.metrics);
        let producers: Vec<_> = self
            .tasks
            .iter()
            .map(|task| tokio::spawn(run_producer(task.clone(), tx.clone(), ctx.clone())))
            .collect();

        let reason = ctx.done().await;
        tracing::info!(reason = %reason, "scheduler shutting down");

        for producer in producers {
            if let Err(err) = producer.await {
                tracing::error!(error = %err, "producer task aborted");
            }
        }

        drop(tx);

        for worker in workers {
            if let Err(err) = worker.await {
                tracing::error!(error = %err, "worker task aborted");
            }
        }

        tracing::info!("scheduler stopped");
    }
}

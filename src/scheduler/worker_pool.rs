//! Worker loops that drain the shared hand-off queue and execute task runs
//! with failure and panic isolation.

use crate::runtime::context::Context;
use crate::runtime::task::{Task, TaskMetrics};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

/// Hand-off queue depth. Producers block until a worker takes their submission.
pub(crate) const HANDOFF_CAPACITY: usize = 1;

/// One pending run. `done` is signalled once the run finished, or dropped
/// unsent when the submission is discarded.
pub(crate) struct Submission {
    pub(crate) task: Arc<dyn Task>,
    pub(crate) done: oneshot::Sender<()>,
}

pub(crate) fn handoff_channel() -> (mpsc::Sender<Submission>, mpsc::Receiver<Submission>) {
    mpsc::channel(HANDOFF_CAPACITY)
}

/// Spawns `count` workers sharing `rx`. Workers exit once the queue is closed
/// and drained, independently of `ctx`.
pub(crate) fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<Submission>,
    ctx: &Context,
    metrics: &Arc<dyn TaskMetrics>,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..count)
        .map(|worker_id| {
            let rx = rx.clone();
            let ctx = ctx.clone();
            let metrics = metrics.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, rx, ctx, metrics).await;
            })
        })
        .collect()
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Submission>>>,
    ctx: Context,
    metrics: Arc<dyn TaskMetrics>,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some(submission) = next else {
            break;
        };

        if submission.done.is_closed() {
            tracing::debug!(
                worker = worker_id,
                group = submission.task.group(),
                id = submission.task.id(),
                "discarding submission abandoned by its producer"
            );
            continue;
        }

        execute(worker_id, submission.task.as_ref(), &ctx, metrics.as_ref()).await;
        let _ = submission.done.send(());
    }

    tracing::trace!(worker = worker_id, "worker exited");
}

async fn execute(worker_id: usize, task: &dyn Task, ctx: &Context, metrics: &dyn TaskMetrics) {
    let result = AssertUnwindSafe(async { task.run(ctx).await })
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::error!(
                worker = worker_id,
                group = task.group(),
                id = task.id(),
                error = %format_args!("{err:#}"),
                "task run failed"
            );
            metrics.inc_failed_task(task.group());
        }
        Err(panic_payload) => {
            let panic_msg = panic_message(panic_payload.as_ref());
            tracing::error!(
                worker = worker_id,
                group = task.group(),
                id = task.id(),
                panic = %panic_msg,
                "task run panicked"
            );
            metrics.inc_failed_task(task.group());
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

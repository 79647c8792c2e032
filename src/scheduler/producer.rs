//! Per-task producer loop: submits immediately, then once per tick, never
//! holding more than one outstanding submission.

use crate::runtime::context::Context;
use crate::runtime::task::Task;
use crate::scheduler::worker_pool::Submission;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, MissedTickBehavior};

pub(crate) async fn run_producer(task: Arc<dyn Task>, tx: mpsc::Sender<Submission>, ctx: Context) {
    let mut ticker = time::interval(task.interval());
    // Ticks missed while a run is outstanding collapse into the next one.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = ctx.done() => break,
            _ = ticker.tick() => {}
        }

        let (done_tx, done_rx) = oneshot::channel();
        let submission = Submission {
            task: task.clone(),
            done: done_tx,
        };

        tokio::select! {
            biased;
            _ = ctx.done() => break,
            sent = tx.send(submission) => {
                if sent.is_err() {
                    tracing::warn!(
                        group = task.group(),
                        id = task.id(),
                        "hand-off queue closed; producer exiting"
                    );
                    break;
                }
            }
        }

        tokio::select! {
            biased;
            _ = ctx.done() => break,
            _ = done_rx => {}
        }
    }

    tracing::trace!(group = task.group(), id = task.id(), "producer exited");
}

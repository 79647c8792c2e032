use crate::runtime::context::Context;
use core::future::Future;
use core::pin::Pin;
use std::time::Duration;

/// Polling cadence used when a data source does not configure its own.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

/// Budget a task should give each run's network calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A unit of periodic polling work, implemented by data-source integrations.
///
/// Implementations are shared read-only between a producer and the workers, so
/// any state they update must synchronise internally.
pub trait Task: Send + Sync + 'static {
    /// Logical grouping, typically a chain id, used to aggregate failures.
    fn group(&self) -> &str;

    /// Distinguishes task kinds within a group, e.g. `latest-block-height`.
    fn id(&self) -> &str;

    /// How often the task should run. Must be non-zero.
    fn interval(&self) -> Duration;

    /// Performs one unit of work. Implementations should derive a bounded child
    /// context (see [`DEFAULT_REQUEST_TIMEOUT`]) before doing any I/O.
    fn run<'a>(&'a self, ctx: &'a Context) -> TaskFuture<'a>;
}

/// Sink for failed task runs.
pub trait TaskMetrics: Send + Sync {
    fn inc_failed_task(&self, group: &str);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl TaskMetrics for NoopMetrics {
    fn inc_failed_task(&self, _group: &str) {}
}

pub fn interval_or_default(interval: Duration) -> Duration {
    if interval.is_zero() {
        DEFAULT_INTERVAL
    } else {
        interval
    }
}

/// `group:id` label used in logs and configuration errors.
pub(crate) fn task_label(task: &dyn Task) -> String {
    format!("{}:{}", task.group(), task.id())
}

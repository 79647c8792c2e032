pub mod rpc;
pub mod runtime;
pub mod scheduler;

pub use rpc::{
    ClientMetrics, Endpoint, FailoverClient, FailoverClientOptions, FailureReason, FetchError,
    HttpTransport, HyperTransport, NoopClientMetrics,
};
pub use runtime::config::{CollectorConfig, CollectorConfigBuilder, CollectorConfigParams};
pub use runtime::context::{Context, ContextError};
pub use runtime::runner::Runner;
pub use runtime::task::{
    interval_or_default, NoopMetrics, Task, TaskFuture, TaskMetrics, DEFAULT_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use runtime::telemetry::{init_tracing, spawn_metrics_reporter, Telemetry, TelemetrySnapshot};
pub use scheduler::Scheduler;

use crate::rpc::metrics::ClientMetrics;
use crate::runtime::task::TaskMetrics;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Label set attached to a failed host attempt.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientErrorKey {
    pub request_type: String,
    pub host: String,
    pub reason: String,
}

/// In-memory failure counters that double as the sink for both the scheduler
/// and the failover client.
#[derive(Default, Debug)]
pub struct Telemetry {
    failed_tasks_total: AtomicU64,
    client_errors_total: AtomicU64,
    failed_tasks: Mutex<BTreeMap<String, u64>>,
    client_errors: Mutex<BTreeMap<ClientErrorKey, u64>>,
}

impl Telemetry {
    pub fn failed_tasks(&self, group: &str) -> u64 {
        self.failed_tasks
            .lock()
            .expect("telemetry mutex poisoned")
            .get(group)
            .copied()
            .unwrap_or(0)
    }

    pub fn client_errors(&self, request_type: &str, host: &str, reason: &str) -> u64 {
        let key = ClientErrorKey {
            request_type: request_type.to_owned(),
            host: host.to_owned(),
            reason: reason.to_owned(),
        };
        self.client_errors
            .lock()
            .expect("telemetry mutex poisoned")
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    pub fn failed_tasks_total(&self) -> u64 {
        self.failed_tasks_total.load(Ordering::Relaxed)
    }

    pub fn client_errors_total(&self) -> u64 {
        self.client_errors_total.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            failed_tasks_total: self.failed_tasks_total(),
            client_errors_total: self.client_errors_total(),
            failed_tasks: self
                .failed_tasks
                .lock()
                .expect("telemetry mutex poisoned")
                .clone(),
            client_errors: self
                .client_errors
                .lock()
                .expect("telemetry mutex poisoned")
                .clone(),
        }
    }
}

impl TaskMetrics for Telemetry {
    fn inc_failed_task(&self, group: &str) {
        self.failed_tasks_total.fetch_add(1, Ordering::Relaxed);
        let mut counts = self.failed_tasks.lock().expect("telemetry mutex poisoned");
        *counts.entry(group.to_owned()).or_default() += 1;
    }
}

impl ClientMetrics for Telemetry {
    fn inc_client_error(&self, request_type: &str, host: &str, reason: &str) {
        self.client_errors_total.fetch_add(1, Ordering::Relaxed);
        let key = ClientErrorKey {
            request_type: request_type.to_owned(),
            host: host.to_owned(),
            reason: reason.to_owned(),
        };
        let mut counts = self.client_errors.lock().expect("telemetry mutex poisoned");
        *counts.entry(key).or_default() += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub failed_tasks_total: u64,
    pub client_errors_total: u64,
    pub failed_tasks: BTreeMap<String, u64>,
    pub client_errors: BTreeMap<ClientErrorKey, u64>,
}

/// Spawns a background task that periodically logs failure counters.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "chainpulse::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current = telemetry.snapshot();
                    let failed_delta = current
                        .failed_tasks_total
                        .saturating_sub(last_snapshot.failed_tasks_total);
                    let client_delta = current
                        .client_errors_total
                        .saturating_sub(last_snapshot.client_errors_total);

                    tracing::info!(
                        target: "chainpulse::metrics",
                        failed_tasks = current.failed_tasks_total,
                        failed_tasks_delta = failed_delta,
                        client_errors = current.client_errors_total,
                        client_errors_delta = client_delta,
                        failing_groups = current.failed_tasks.len(),
                        "runtime metrics snapshot"
                    );

                    last_snapshot = current;
                }
            }
        }
    })
}

use crate::rpc::client::FailoverClient;
use crate::rpc::metrics::ClientMetrics;
use crate::rpc::options::{FailoverClientOptions, DEFAULT_HTTP_BODY_LIMIT_BYTES};
use crate::rpc::transport::HyperTransport;
use crate::runtime::task::{DEFAULT_INTERVAL, DEFAULT_REQUEST_TIMEOUT};
use crate::runtime::telemetry;
use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const WORKERS_PER_CPU: usize = 25;

/// Runtime configuration for the collector.
///
/// All instances must be constructed via [`CollectorConfig::builder`] or [`CollectorConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    worker_count: usize,
    request_timeout: Duration,
    http_timeout: Duration,
    default_interval: Duration,
    metrics_interval: Duration,
    max_response_body_bytes: usize,
}

pub struct CollectorConfigParams {
    pub worker_count: usize,
    pub request_timeout: Duration,
    pub http_timeout: Duration,
    pub default_interval: Duration,
    pub metrics_interval: Duration,
    pub max_response_body_bytes: usize,
}

impl CollectorConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: CollectorConfigParams) -> Result<Self> {
        let CollectorConfigParams {
            worker_count,
            request_timeout,
            http_timeout,
            default_interval,
            metrics_interval,
            max_response_body_bytes,
        } = params;

        let config = Self {
            worker_count,
            request_timeout,
            http_timeout,
            default_interval,
            metrics_interval,
            max_response_body_bytes,
        };

        config.validate()?;
        Ok(config)
    }

    /// Number of scheduler workers executing task runs concurrently.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Budget each task run gives its network calls.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Per-request timeout enforced by the HTTP transport.
    pub fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    /// Polling interval for sources that do not configure one.
    pub fn default_interval(&self) -> Duration {
        self.default_interval
    }

    /// Resolves a source's configured polling interval, substituting
    /// `default_interval` when it is zero.
    pub fn interval_or_default(&self, interval: Duration) -> Duration {
        if interval.is_zero() {
            self.default_interval
        } else {
            interval
        }
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Maximum response body size read by the failover client helpers.
    pub fn max_response_body_bytes(&self) -> usize {
        self.max_response_body_bytes
    }

    /// Builds a failover client over `hosts` backed by a [`HyperTransport`]
    /// bounded by `http_timeout`, capping bodies at `max_response_body_bytes`.
    pub fn failover_client<I, S>(
        &self,
        hosts: I,
        request_type: &str,
        metrics: Arc<dyn ClientMetrics>,
    ) -> Result<FailoverClient>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = FailoverClientOptions {
            request_type: request_type.to_owned(),
            max_response_body_bytes: self.max_response_body_bytes,
        };
        FailoverClient::with_options(
            hosts,
            Arc::new(HyperTransport::new(self.http_timeout)),
            metrics,
            options,
        )
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }

        if self.http_timeout.is_zero() {
            bail!("http_timeout must be greater than 0");
        }

        if self.default_interval.is_zero() {
            bail!("default_interval must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        if self.max_response_body_bytes == 0 {
            bail!("max_response_body_bytes must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CollectorConfigBuilder {
    worker_count: Option<usize>,
    request_timeout: Option<Duration>,
    http_timeout: Option<Duration>,
    default_interval: Option<Duration>,
    metrics_interval: Option<Duration>,
    max_response_body_bytes: Option<usize>,
}

impl CollectorConfigBuilder {
    pub fn worker_count(mut self, count: usize) -> Self {
        self.worker_count = Some(count);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = Some(interval);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn max_response_body_bytes(mut self, bytes: usize) -> Self {
        self.max_response_body_bytes = Some(bytes);
        self
    }

    pub fn build(self) -> Result<CollectorConfig> {
        let params = CollectorConfigParams {
            worker_count: self.worker_count.unwrap_or_else(default_worker_count),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            http_timeout: self
                .http_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
            default_interval: self.default_interval.unwrap_or(DEFAULT_INTERVAL),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
            max_response_body_bytes: self
                .max_response_body_bytes
                .unwrap_or(DEFAULT_HTTP_BODY_LIMIT_BYTES),
        };

        CollectorConfig::new(params)
    }
}

/// Polling is I/O bound, so the pool is sized well above the core count.
fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|cpus| cpus.get())
        .unwrap_or(1)
        .saturating_mul(WORKERS_PER_CPU)
}

//! Failure-reporting surface of the failover client. Implementations are
//! shared across every task using the client and must synchronise internally.

pub trait ClientMetrics: Send + Sync {
    /// Records one failed attempt against `host`. `reason` is `timeout`,
    /// `unknown`, or the numeric HTTP status code.
    fn inc_client_error(&self, request_type: &str, host: &str, reason: &str);
}

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopClientMetrics;

impl ClientMetrics for NoopClientMetrics {
    fn inc_client_error(&self, _request_type: &str, _host: &str, _reason: &str) {}
}

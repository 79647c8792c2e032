//! Per-host failure type of the failover client and its classification into
//! report reasons.

use crate::runtime::context::ContextError;
use hyper::StatusCode;
use std::borrow::Cow;

/// Failure of one attempt against one host.
#[derive(Debug)]
pub enum FetchError {
    /// The host answered with a non-2xx status.
    Status { url: String, status: StatusCode },
    /// The caller's context ended while the attempt was in flight.
    Context { url: String, reason: ContextError },
    /// The transport failed to produce a response (DNS, refused, reset, ...).
    Transport { url: String, source: anyhow::Error },
    /// The request could not be built for this host.
    InvalidRequest { host: String, source: anyhow::Error },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status { url, status } => {
                write!(f, "{url}: bad status code {}", status.as_u16())
            }
            FetchError::Context { url, reason } => write!(f, "{url}: {reason}"),
            FetchError::Transport { url, source } => write!(f, "{url}: {source:#}"),
            FetchError::InvalidRequest { host, source } => {
                write!(f, "malformed request for {host}: {source:#}")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Context { reason, .. } => {
                Some(reason as &(dyn std::error::Error + 'static))
            }
            FetchError::Transport { source, .. } | FetchError::InvalidRequest { source, .. } => {
                let source: &(dyn std::error::Error + 'static) = source.as_ref();
                Some(source)
            }
            FetchError::Status { .. } => None,
        }
    }
}

/// Category attached to a failure report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout,
    Status(StatusCode),
    Unknown,
}

impl FailureReason {
    pub fn label(&self) -> Cow<'static, str> {
        match self {
            FailureReason::Timeout => Cow::Borrowed("timeout"),
            FailureReason::Status(status) => Cow::Owned(status.as_u16().to_string()),
            FailureReason::Unknown => Cow::Borrowed("unknown"),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

impl FetchError {
    /// Reason to report for this failure, or `None` when the failure stems from
    /// cancellation and must stay out of the error stream.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            FetchError::Status { status, .. } => Some(FailureReason::Status(*status)),
            FetchError::Context { reason, .. } => classify_context(*reason),
            FetchError::Transport { source, .. } | FetchError::InvalidRequest { source, .. } => {
                match context_error_in_chain(source) {
                    Some(reason) => classify_context(reason),
                    None => Some(FailureReason::Unknown),
                }
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_none()
    }
}

fn classify_context(reason: ContextError) -> Option<FailureReason> {
    match reason {
        ContextError::DeadlineExceeded => Some(FailureReason::Timeout),
        ContextError::Cancelled => None,
    }
}

/// Walks the error chain looking for a deadline or cancellation, including
/// tokio's own timeout error.
fn context_error_in_chain(err: &anyhow::Error) -> Option<ContextError> {
    err.chain().find_map(|cause| {
        if let Some(reason) = cause.downcast_ref::<ContextError>() {
            Some(*reason)
        } else if cause.is::<tokio::time::error::Elapsed>() {
            Some(ContextError::DeadlineExceeded)
        } else {
            None
        }
    })
}

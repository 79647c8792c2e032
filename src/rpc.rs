//! Failover HTTP client plumbing: host endpoints, authentication, transport,
//! failure classification, metrics, and body helpers.

pub(crate) mod auth;
pub mod client;
pub mod endpoint;
pub mod error;
pub mod helpers;
pub mod metrics;
pub mod options;
pub mod transport;

pub use client::FailoverClient;
pub use endpoint::Endpoint;
pub use error::{FailureReason, FetchError};
pub use helpers::{decode_json, read_body};
pub use metrics::{ClientMetrics, NoopClientMetrics};
pub use options::FailoverClientOptions;
pub use transport::{HttpTransport, HyperTransport};

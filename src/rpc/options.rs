//! Configurable knobs for the failover client along with validation helpers.

use anyhow::{bail, Result};

pub const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_REQUEST_TYPE: &str = "rest";

#[derive(Debug, Clone)]
pub struct FailoverClientOptions {
    /// Label attached to every failure report, e.g. `rest` or `rpc`.
    pub request_type: String,
    pub max_response_body_bytes: usize,
}

impl Default for FailoverClientOptions {
    fn default() -> Self {
        Self {
            request_type: DEFAULT_REQUEST_TYPE.to_owned(),
            max_response_body_bytes: DEFAULT_HTTP_BODY_LIMIT_BYTES,
        }
    }
}

impl FailoverClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_type.trim().is_empty() {
            bail!("request_type cannot be empty");
        }
        if self.max_response_body_bytes == 0 {
            bail!("max_response_body_bytes must be greater than 0");
        }
        Ok(())
    }
}

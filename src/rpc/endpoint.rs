//! Parsed host base URLs used by the failover client.

use crate::rpc::auth::{build_basic_auth, decode_userinfo, split_userinfo};
use anyhow::{bail, Context, Result};
use hyper::header::HeaderValue;
use hyper::Uri;

/// One candidate host: scheme, authority, and base path, with any embedded
/// credentials moved into a ready-made `Authorization` header.
#[derive(Debug, Clone)]
pub struct Endpoint {
    scheme: String,
    authority: String,
    hostname: String,
    base_path: String,
    authorization: Option<HeaderValue>,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let uri: Uri = raw
            .parse()
            .with_context(|| format!("invalid host url {raw:?}"))?;

        let scheme = match uri.scheme_str() {
            Some(scheme @ ("http" | "https")) => scheme.to_owned(),
            _ => bail!("host url {raw:?} must start with http:// or https://"),
        };
        let Some(authority) = uri.authority() else {
            bail!("host url {raw:?} is missing a host");
        };
        if uri.query().is_some() {
            bail!("host url {raw:?} cannot carry a query string");
        }

        let (credentials, host_port) = split_userinfo(authority.as_str());
        if host_port.is_empty() {
            bail!("host url {raw:?} is missing a host");
        }
        let authorization = credentials
            .map(|(user, password)| {
                let user = decode_userinfo(user)?;
                let password = decode_userinfo(password)?;
                build_basic_auth(&user, &password)
            })
            .transpose()
            .with_context(|| format!("invalid credentials in host url {raw:?}"))?;

        Ok(Self {
            scheme,
            authority: host_port.to_owned(),
            hostname: authority
                .host()
                .trim_start_matches('[')
                .trim_end_matches(']')
                .to_owned(),
            base_path: uri.path().trim_end_matches('/').to_owned(),
            authorization,
        })
    }

    /// Host name without port or credentials, used to tag failure reports.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub(crate) fn authorization(&self) -> Option<&HeaderValue> {
        self.authorization.as_ref()
    }

    /// Appends `path` (which may carry a query) to the base address.
    pub fn join(&self, path: &str) -> Result<Uri> {
        let separator = if path.is_empty() || path.starts_with('/') || path.starts_with('?') {
            ""
        } else {
            "/"
        };
        let mut full_path = format!("{}{separator}{path}", self.base_path);
        if full_path.is_empty() || full_path.starts_with('?') {
            full_path.insert(0, '/');
        }

        format!("{}://{}{}", self.scheme, self.authority, full_path)
            .parse()
            .with_context(|| format!("invalid request path {path:?} for host {}", self.hostname))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority, self.base_path)
    }
}

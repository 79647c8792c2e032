//! HTTP authentication helpers for host URLs that embed `user:password@`
//! credentials.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use hyper::header::HeaderValue;
use std::borrow::Cow;

pub(crate) fn build_basic_auth(user: &str, password: &str) -> Result<HeaderValue> {
    let credentials = format!("{user}:{password}");
    let encoded = BASE64_STANDARD.encode(credentials);
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .context("failed to build Authorization header")?;
    value.set_sensitive(true);
    Ok(value)
}

/// Percent-decodes one userinfo component, e.g. `p%40ss` into `p@ss`.
pub(crate) fn decode_userinfo(part: &str) -> Result<Cow<'_, str>> {
    urlencoding::decode(part).context("userinfo is not valid percent-encoded UTF-8")
}

/// Splits a URL authority into optional `(user, password)` credentials and the
/// bare `host[:port]` part.
pub(crate) fn split_userinfo(authority: &str) -> (Option<(&str, &str)>, &str) {
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => {
            let credentials = userinfo.split_once(':').unwrap_or((userinfo, ""));
            (Some(credentials), host)
        }
        None => (None, authority),
    }
}

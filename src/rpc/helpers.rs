//! Utility helpers for consuming response bodies returned by the failover client.

use anyhow::{bail, Context, Result};
use hyper::body::{Bytes, HttpBody};
use hyper::{Body, Response};
use serde::de::DeserializeOwned;

/// Collects a response body, failing once more than `limit` bytes arrive.
pub async fn read_body(response: Response<Body>, limit: usize) -> Result<Bytes> {
    let mut body = response.into_body();
    let mut collected = Vec::new();

    while let Some(chunk) = body.data().await {
        let chunk = chunk.context("failed to read response body")?;
        if collected.len().saturating_add(chunk.len()) > limit {
            bail!("response body exceeded {limit} bytes");
        }
        collected.extend_from_slice(&chunk);
    }

    Ok(Bytes::from(collected))
}

/// Reads and decodes a JSON response body.
pub async fn decode_json<T: DeserializeOwned>(response: Response<Body>, limit: usize) -> Result<T> {
    let bytes = read_body(response, limit).await?;
    serde_json::from_slice(&bytes).context("malformed json")
}

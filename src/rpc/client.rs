//! Failover HTTP client that walks an ordered list of redundant hosts for each
//! logical GET, returning the first 2xx response or the last host's failure.

use crate::rpc::endpoint::Endpoint;
use crate::rpc::error::FetchError;
use crate::rpc::helpers::decode_json;
use crate::rpc::metrics::ClientMetrics;
use crate::rpc::options::FailoverClientOptions;
use crate::rpc::transport::HttpTransport;
use crate::runtime::context::Context;
use anyhow::{bail, Result};
use hyper::header::{HeaderMap, AUTHORIZATION};
use hyper::{Body, Method, Request, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Stateless apart from the injected metrics sink; clones share everything.
#[derive(Clone)]
pub struct FailoverClient {
    hosts: Arc<[Endpoint]>,
    transport: Arc<dyn HttpTransport>,
    metrics: Arc<dyn ClientMetrics>,
    options: Arc<FailoverClientOptions>,
}

impl fmt::Debug for FailoverClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverClient")
            .field("hosts", &self.hosts)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl FailoverClient {
    pub fn new<I, S>(
        hosts: I,
        transport: Arc<dyn HttpTransport>,
        metrics: Arc<dyn ClientMetrics>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_options(hosts, transport, metrics, FailoverClientOptions::default())
    }

    pub fn with_options<I, S>(
        hosts: I,
        transport: Arc<dyn HttpTransport>,
        metrics: Arc<dyn ClientMetrics>,
        options: FailoverClientOptions,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        options.validate()?;

        let hosts = hosts
            .into_iter()
            .map(|host| Endpoint::parse(host.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        if hosts.is_empty() {
            bail!("failover client requires at least one host");
        }

        Ok(Self {
            hosts: hosts.into(),
            transport,
            metrics,
            options: Arc::new(options),
        })
    }

    pub fn hosts(&self) -> &[Endpoint] {
        &self.hosts
    }

    pub fn request_type(&self) -> &str {
        &self.options.request_type
    }

    pub fn options(&self) -> &FailoverClientOptions {
        &self.options
    }

    /// Issues a GET for `path` (optionally carrying a query) against each host
    /// in order until one answers with a 2xx status.
    ///
    /// All attempts share `ctx`'s deadline. When every host fails, the error of
    /// the last attempted host is returned; it downcasts to [`FetchError`].
    pub async fn get(&self, ctx: &Context, path: &str) -> Result<Response<Body>> {
        self.get_inner(ctx, path, None).await
    }

    pub async fn get_with_headers(
        &self,
        ctx: &Context,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Response<Body>> {
        self.get_inner(ctx, path, Some(headers)).await
    }

    /// Failover GET followed by a size-capped JSON decode of the body.
    pub async fn get_json<T: DeserializeOwned>(&self, ctx: &Context, path: &str) -> Result<T> {
        let response = self.get(ctx, path).await?;
        decode_json(response, self.options.max_response_body_bytes).await
    }

    async fn get_inner(
        &self,
        ctx: &Context,
        path: &str,
        headers: Option<&HeaderMap>,
    ) -> Result<Response<Body>> {
        let mut last_error: Option<FetchError> = None;

        for host in self.hosts.iter() {
            match self.attempt(ctx, host, path, headers).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    tracing::debug!(
                        host = host.hostname(),
                        path,
                        method = "GET",
                        error = %err,
                        "failover request attempt failed"
                    );
                    self.record_failure(host, &err);
                    let cancelled = err.is_cancelled();
                    last_error = Some(err);
                    if cancelled {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(err) => Err(err.into()),
            None => bail!("failover client has no hosts"),
        }
    }

    async fn attempt(
        &self,
        ctx: &Context,
        host: &Endpoint,
        path: &str,
        headers: Option<&HeaderMap>,
    ) -> Result<Response<Body>, FetchError> {
        let request = build_request(host, path, headers).map_err(|source| {
            FetchError::InvalidRequest {
                host: host.hostname().to_owned(),
                source,
            }
        })?;
        let url = request.uri().to_string();

        let response = match ctx.run(self.transport.send(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(source)) => return Err(FetchError::Transport { url, source }),
            Err(reason) => return Err(FetchError::Context { url, reason }),
        };

        let status = response.status();
        if !status.is_success() {
            drop(response);
            return Err(FetchError::Status { url, status });
        }

        Ok(response)
    }

    fn record_failure(&self, host: &Endpoint, err: &FetchError) {
        if let Some(reason) = err.reason() {
            self.metrics
                .inc_client_error(&self.options.request_type, host.hostname(), &reason.label());
        }
    }
}

fn build_request(host: &Endpoint, path: &str, headers: Option<&HeaderMap>) -> Result<Request<Body>> {
    let uri = host.join(path)?;
    let mut request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())?;

    if let Some(headers) = headers {
        *request.headers_mut() = headers.clone();
    }
    if let Some(authorization) = host.authorization() {
        if !request.headers().contains_key(AUTHORIZATION) {
            request
                .headers_mut()
                .insert(AUTHORIZATION, authorization.clone());
        }
    }

    Ok(request)
}

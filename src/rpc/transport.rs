//! The single-request HTTP dependency of the failover client: any async
//! function from request to response, or the hyper-backed [`HyperTransport`].

use crate::runtime::context::ContextError;
use anyhow::Result;
use futures::future::BoxFuture;
use hyper::client::HttpConnector;
use hyper::{Body, Client, Request, Response};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

pub trait HttpTransport: Send + Sync {
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>>;
}

impl<F, Fut> HttpTransport for F
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response<Body>>> + Send + 'static,
{
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>> {
        Box::pin(self(request))
    }
}

/// Plain-HTTP transport over a pooled hyper client. Each request is bounded by
/// `request_timeout`; expiry surfaces as [`ContextError::DeadlineExceeded`].
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
}

impl HyperTransport {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            request_timeout,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl HttpTransport for HyperTransport {
    fn send(&self, request: Request<Body>) -> BoxFuture<'static, Result<Response<Body>>> {
        let client = self.client.clone();
        let limit = self.request_timeout;
        Box::pin(async move {
            match timeout(limit, client.request(request)).await {
                Ok(result) => Ok(result?),
                Err(_) => Err(ContextError::DeadlineExceeded.into()),
            }
        })
    }
}

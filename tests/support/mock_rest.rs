use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, RwLock},
    time::Duration,
};

use anyhow::{Context, Result};
use hyper::header::AUTHORIZATION;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Canned answer for one request path.
#[derive(Clone, Debug)]
pub struct MockRoute {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl MockRoute {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct MockState {
    routes: HashMap<String, MockRoute>,
    hits: HashMap<String, usize>,
    authorizations: Vec<String>,
}

/// Tendermint-style REST node answering GETs from a path-keyed route table.
/// Unknown paths answer 404.
#[derive(Clone, Default)]
pub struct MockNode {
    state: Arc<RwLock<MockState>>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, path: &str, route: MockRoute) -> Self {
        self.set_route(path, route);
        self
    }

    pub fn set_route(&self, path: &str, route: MockRoute) {
        self.state
            .write()
            .expect("mock node poisoned")
            .routes
            .insert(path.to_owned(), route);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state
            .read()
            .expect("mock node poisoned")
            .hits
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn authorizations(&self) -> Vec<String> {
        self.state
            .read()
            .expect("mock node poisoned")
            .authorizations
            .clone()
    }

    fn record(&self, req: &Request<Body>) -> Option<MockRoute> {
        let mut state = self.state.write().expect("mock node poisoned");
        let key = match req.uri().query() {
            Some(query) => format!("{}?{query}", req.uri().path()),
            None => req.uri().path().to_owned(),
        };
        *state.hits.entry(key.clone()).or_default() += 1;
        if let Some(value) = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            state.authorizations.push(value.to_owned());
        }
        state.routes.get(&key).cloned()
    }
}

pub struct MockRestServer {
    url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockRestServer {
    pub async fn start(node: MockNode) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock REST listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let make_service = make_service_fn(move |_| {
            let node = node.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(node.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock REST server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

/// Address nothing listens on, for connection-refused scenarios.
pub async fn unused_address() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("failed to reserve a local port")?;
    listener
        .local_addr()
        .context("failed to read reserved address")
}

async fn serve_request(node: MockNode, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::GET {
        let mut response = Response::new(Body::from("Unsupported method"));
        *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
        return Ok(response);
    }

    let Some(route) = node.record(&req) else {
        let mut response = Response::new(Body::from("not found"));
        *response.status_mut() = StatusCode::NOT_FOUND;
        return Ok(response);
    };

    if !route.delay.is_zero() {
        sleep(route.delay).await;
    }

    let mut response = Response::new(Body::from(route.body));
    *response.status_mut() = route.status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    Ok(response)
}

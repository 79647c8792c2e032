use std::{sync::Arc, time::Duration};

use crate::support::{
    helpers::{init_tracing, status_body, StatusResponse},
    mock_rest::{unused_address, MockNode, MockRestServer, MockRoute},
};
use anyhow::Result;
use chainpulse::{CollectorConfig, Context, FetchError, Telemetry};
use hyper::StatusCode;

const LOCALHOST: &str = "127.0.0.1";

fn config(http_timeout: Duration) -> Result<CollectorConfig> {
    CollectorConfig::builder()
        .worker_count(2)
        .http_timeout(http_timeout)
        .build()
}

#[tokio::test]
async fn falls_back_to_second_host_on_bad_status() -> Result<()> {
    init_tracing();
    let broken = MockNode::new().with_route("/status", MockRoute::status(StatusCode::INTERNAL_SERVER_ERROR));
    let healthy = MockNode::new().with_route("/status", MockRoute::ok(status_body(1234)));
    let first = MockRestServer::start(broken.clone()).await?;
    let second = MockRestServer::start(healthy.clone()).await?;

    let telemetry = Arc::new(Telemetry::default());
    let client = config(Duration::from_secs(5))?.failover_client(
        [first.url(), second.url()],
        "rest",
        telemetry.clone(),
    )?;

    let status: StatusResponse = client.get_json(&Context::new(), "/status").await?;
    assert_eq!(status.sync_info.latest_block_height, "1234");
    assert!(!status.sync_info.catching_up);
    assert_eq!(broken.hits("/status"), 1);
    assert_eq!(healthy.hits("/status"), 1);
    assert_eq!(telemetry.client_errors("rest", LOCALHOST, "500"), 1);
    assert_eq!(telemetry.client_errors_total(), 1);

    first.shutdown().await;
    second.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn connection_refused_is_reported_as_unknown() -> Result<()> {
    init_tracing();
    let dead = format!("http://{}", unused_address().await?);
    let healthy = MockNode::new().with_route("/status", MockRoute::ok(status_body(7)));
    let server = MockRestServer::start(healthy).await?;

    let telemetry = Arc::new(Telemetry::default());
    let client = config(Duration::from_secs(5))?.failover_client(
        [dead.as_str(), server.url()],
        "rpc",
        telemetry.clone(),
    )?;

    let response = client.get(&Context::new(), "/status").await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(telemetry.client_errors("rpc", LOCALHOST, "unknown"), 1);
    assert_eq!(telemetry.client_errors_total(), 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn slow_host_times_out_at_the_transport() -> Result<()> {
    init_tracing();
    let slow = MockNode::new().with_route(
        "/status",
        MockRoute::ok(status_body(1)).delayed(Duration::from_secs(2)),
    );
    let healthy = MockNode::new().with_route("/status", MockRoute::ok(status_body(2)));
    let first = MockRestServer::start(slow).await?;
    let second = MockRestServer::start(healthy).await?;

    let telemetry = Arc::new(Telemetry::default());
    let client = config(Duration::from_millis(100))?.failover_client(
        [first.url(), second.url()],
        "rest",
        telemetry.clone(),
    )?;

    let status: StatusResponse = client.get_json(&Context::new(), "/status").await?;
    assert_eq!(status.sync_info.latest_block_height, "2");
    assert_eq!(telemetry.client_errors("rest", LOCALHOST, "timeout"), 1);

    first.shutdown().await;
    second.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn all_hosts_failing_returns_last_error() -> Result<()> {
    init_tracing();
    let missing = MockNode::new();
    let unavailable =
        MockNode::new().with_route("/status", MockRoute::status(StatusCode::SERVICE_UNAVAILABLE));
    let first = MockRestServer::start(missing).await?;
    let second = MockRestServer::start(unavailable).await?;

    let telemetry = Arc::new(Telemetry::default());
    let client = config(Duration::from_secs(5))?.failover_client(
        [first.url(), second.url()],
        "rest",
        telemetry.clone(),
    )?;

    let err = client
        .get(&Context::new(), "/status")
        .await
        .expect_err("every host fails");
    match err.downcast_ref::<FetchError>() {
        Some(FetchError::Status { url, status }) => {
            assert_eq!(*status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(url, &format!("{}/status", second.url()));
        }
        other => panic!("expected the last host's status error, got {other:?}"),
    }
    assert_eq!(telemetry.client_errors("rest", LOCALHOST, "404"), 1);
    assert_eq!(telemetry.client_errors("rest", LOCALHOST, "503"), 1);

    first.shutdown().await;
    second.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn cancelled_context_reports_nothing() -> Result<()> {
    init_tracing();
    let slow = MockNode::new().with_route(
        "/status",
        MockRoute::ok(status_body(1)).delayed(Duration::from_secs(2)),
    );
    let server = MockRestServer::start(slow).await?;

    let telemetry = Arc::new(Telemetry::default());
    let client = config(Duration::from_secs(5))?.failover_client(
        [server.url(), server.url()],
        "rest",
        telemetry.clone(),
    )?;

    let ctx = Context::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = client
        .get(&ctx, "/status")
        .await
        .expect_err("cancelled request fails");
    assert!(err
        .downcast_ref::<FetchError>()
        .is_some_and(FetchError::is_cancelled));
    assert_eq!(telemetry.client_errors_total(), 0);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn url_credentials_become_basic_auth() -> Result<()> {
    init_tracing();
    let node = MockNode::new().with_route("/status", MockRoute::ok(status_body(3)));
    let server = MockRestServer::start(node.clone()).await?;
    let with_credentials = server.url().replacen("http://", "http://user:pass@", 1);

    let client = config(Duration::from_secs(5))?.failover_client(
        [with_credentials.as_str()],
        "rest",
        Arc::new(Telemetry::default()),
    )?;

    client.get(&Context::new(), "/status").await?;
    assert_eq!(node.authorizations(), vec!["Basic dXNlcjpwYXNz".to_owned()]);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn oversized_bodies_are_rejected() -> Result<()> {
    init_tracing();
    let node = MockNode::new().with_route("/status", MockRoute::ok(status_body(123_456_789)));
    let server = MockRestServer::start(node).await?;

    let config = CollectorConfig::builder()
        .worker_count(1)
        .max_response_body_bytes(16)
        .build()?;
    let client = config.failover_client([server.url()], "rest", Arc::new(Telemetry::default()))?;

    let err = client
        .get_json::<StatusResponse>(&Context::new(), "/status")
        .await
        .expect_err("body exceeds the configured cap");
    assert!(format!("{err:#}").contains("exceeded 16 bytes"));

    server.shutdown().await;
    Ok(())
}

//! Reachability checks against a scripted probe and a local HTTP server.

mod common;

use std::collections::HashMap;

use common::{init_tracing, FakeProbe, HttpReply};
use homeflow::core::DEFAULT_HOST;
use homeflow::{FlowError, Probe, ReachabilityChecker, RetryPolicy, SystemProbe, TargetSpec};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn checker(probe: &FakeProbe) -> ReachabilityChecker<FakeProbe> {
    ReachabilityChecker::new(probe.clone())
        .with_retry_policies(RetryPolicy::fixed(2, 0), RetryPolicy::fixed(2, 0))
}

fn targets(hosts: &[&str], endpoints: &[&str]) -> TargetSpec {
    TargetSpec::new(
        Some(hosts.iter().map(|s| s.to_string()).collect()),
        Some(endpoints.iter().map(|s| s.to_string()).collect()),
    )
}

fn report(entries: &[(&str, bool)]) -> HashMap<String, bool> {
    entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[tokio::test]
async fn test_reachable_host() {
    init_tracing();
    let probe = FakeProbe::new().host("10.0.0.1", true);

    let result = checker(&probe).check(&targets(&["10.0.0.1"], &[])).await.unwrap();

    assert_eq!(result.into_map(), report(&[("10.0.0.1", true)]));
}

#[tokio::test]
async fn test_mixed_hosts_and_endpoints() {
    init_tracing();
    let probe = FakeProbe::new()
        .host("10.0.0.1", false)
        .endpoint("http://nas.local", [HttpReply::Status(200)])
        .endpoint("http://nas.local/missing", [HttpReply::Status(404)])
        .endpoint("http://git.local", [HttpReply::Status(302)]);

    let result = checker(&probe)
        .check(&targets(
            &["10.0.0.1"],
            &["http://nas.local", "http://nas.local/missing", "http://git.local"],
        ))
        .await
        .unwrap();

    assert_eq!(
        result.into_map(),
        report(&[
            ("10.0.0.1", false),
            ("http://nas.local", true),
            ("http://nas.local/missing", false),
            ("http://git.local", true),
        ])
    );
}

#[tokio::test]
async fn test_omitted_hosts_ping_default_gateway() {
    init_tracing();
    let probe = FakeProbe::new().host(DEFAULT_HOST, true);

    let result = checker(&probe).check(&TargetSpec::default()).await.unwrap();

    assert_eq!(probe.calls(), vec![format!("ping {}", DEFAULT_HOST)]);
    assert_eq!(result.get(DEFAULT_HOST), Some(true));
    assert_eq!(result.len(), 1);
}

#[tokio::test]
async fn test_empty_lists_check_nothing() {
    init_tracing();
    let probe = FakeProbe::new();

    let result = checker(&probe).check(&targets(&[], &[])).await.unwrap();

    assert!(result.is_empty());
    assert!(probe.calls().is_empty());
}

#[tokio::test]
async fn test_hosts_are_probed_before_endpoints() {
    init_tracing();
    let probe = FakeProbe::new()
        .host("a", true)
        .host("b", true)
        .endpoint("http://x", [HttpReply::Status(200)]);

    checker(&probe)
        .check(&targets(&["a", "b"], &["http://x"]))
        .await
        .unwrap();

    assert_eq!(probe.calls(), vec!["ping a", "ping b", "GET http://x"]);
}

#[tokio::test]
async fn test_flaky_endpoint_recovers_within_retries() {
    init_tracing();
    let probe = FakeProbe::new().endpoint(
        "http://flaky",
        [
            HttpReply::TransportError,
            HttpReply::TransportError,
            HttpReply::Status(204),
        ],
    );

    let result = checker(&probe)
        .check(&targets(&[], &["http://flaky"]))
        .await
        .unwrap();

    assert_eq!(result.get("http://flaky"), Some(true));
    assert_eq!(probe.calls().len(), 3);
}

#[tokio::test]
async fn test_transport_error_propagates_after_retries() {
    init_tracing();
    let probe = FakeProbe::new().host("a", true);

    let err = checker(&probe)
        .check(&targets(&["a"], &["http://down"]))
        .await
        .unwrap_err();

    assert!(matches!(err, FlowError::Io { .. }));
    assert_eq!(
        probe.calls(),
        vec!["ping a", "GET http://down", "GET http://down", "GET http://down"]
    );
}

/// Serve a fixed set of routes until the listener is dropped
async fn serve() -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request.split_whitespace().nth(1).unwrap_or("/");

                let response = match path {
                    "/ok" => "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                    "/moved" => {
                        "HTTP/1.1 301 Moved Permanently\r\nLocation: /ok\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                    }
                    _ => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                };
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (base, handle)
}

fn local_probe() -> SystemProbe {
    let client = reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .unwrap();
    SystemProbe::with_client(client)
}

#[tokio::test]
async fn test_system_probe_follows_redirects() {
    init_tracing();
    let (base, server) = serve().await;
    let probe = local_probe();

    assert_eq!(probe.http_status(&format!("{base}/ok")).await.unwrap(), 200);
    assert_eq!(probe.http_status(&format!("{base}/moved")).await.unwrap(), 200);
    assert_eq!(probe.http_status(&format!("{base}/nope")).await.unwrap(), 404);

    server.abort();
}

#[tokio::test]
async fn test_system_probe_in_checker() {
    init_tracing();
    let (base, server) = serve().await;
    let ok = format!("{base}/ok");
    let missing = format!("{base}/missing");

    let result = ReachabilityChecker::new(local_probe())
        .with_retry_policies(RetryPolicy::none(), RetryPolicy::none())
        .check(&TargetSpec::new(Some(vec![]), Some(vec![ok.clone(), missing.clone()])))
        .await
        .unwrap();

    assert_eq!(result.get(&ok), Some(true));
    assert_eq!(result.get(&missing), Some(false));

    server.abort();
}

#[tokio::test]
async fn test_connection_refused_is_http_error() {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/", listener.local_addr().unwrap());
    drop(listener);

    let err = local_probe().http_status(&url).await.unwrap_err();

    assert!(matches!(err, FlowError::Http { .. }));
    assert!(err.is_retryable());
}

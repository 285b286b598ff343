//! Tests for the watcher client against a mock HTTP server

use super::*;
use crate::config::RetryConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

const SNAPSHOT: &str = r#"{
    "timestamp": 1700000000,
    "window": {"duration": "15m", "start": 1699999100, "end": 1700000000},
    "source": "Prometheus",
    "data": {
        "node-a": {
            "metrics": [
                {"name": "instance:node_memory_utilisation:ratio", "type": "Memory", "operator": "Latest", "value": 95.0},
                {"name": "instance:node_cpu:ratio", "type": "CPU", "operator": "AVG", "rollup": "AVG", "value": 12.5}
            ],
            "tags": {},
            "metadata": {"dataCenter": "eu-1"}
        },
        "node-b": {
            "metrics": [
                {"name": "instance:node_memory_utilisation:ratio", "type": "Memory", "operator": "Latest", "value": 50.0}
            ]
        }
    }
}"#;

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn test_fetch_snapshot_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/watcher")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(SNAPSHOT)
        .expect(1)
        .create_async()
        .await;

    let client = WatcherClient::new(&server.url()).unwrap();
    let snapshot = client.fetch_snapshot().await.unwrap();

    mock.assert_async().await;

    assert_eq!(snapshot.timestamp, 1700000000);
    assert_eq!(snapshot.window.duration, "15m");
    assert_eq!(snapshot.window.start, 1699999100);
    assert_eq!(snapshot.window.end, 1700000000);
    assert_eq!(snapshot.source, "Prometheus");
    assert_eq!(snapshot.node_count(), 2);

    let node_a = snapshot.node("node-a").unwrap();
    assert_eq!(node_a.metrics.len(), 2);
    assert_eq!(node_a.metrics[0].value, 95.0);
    assert_eq!(node_a.metrics[1].rollup.as_deref(), Some("AVG"));
    assert_eq!(node_a.metadata.data_center.as_deref(), Some("eu-1"));

    let node_b = snapshot.node("node-b").unwrap();
    assert_eq!(node_b.latest_memory().unwrap().value, 50.0);
}

#[tokio::test]
async fn test_trailing_slash_in_address() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/watcher")
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let client = WatcherClient::new(&format!("{}/", server.url())).unwrap();
    assert!(client.url().as_str().ends_with("/watcher"));
    client.fetch_snapshot().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/watcher")
        .with_status(200)
        .with_body("{\"timestamp\": \"not-a-number\"")
        .expect(1)
        .create_async()
        .await;

    let client = WatcherClient::new(&server.url()).unwrap();
    let err = client.fetch_snapshot().await.unwrap_err();

    mock.assert_async().await;
    assert!(matches!(err, WatcherError::Decode(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_non_ok_status_is_error_and_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/watcher")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let config = WatcherClientConfig::new(server.url()).with_retry(fast_retry(3));
    let client = WatcherClient::with_config(config).unwrap();
    let err = client.fetch_snapshot().await.unwrap_err();

    mock.assert_async().await;
    match err {
        WatcherError::UnexpectedStatus { status } => assert_eq!(status.as_u16(), 503),
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Port 1 is reserved and nothing listens on it in test environments
    let client = WatcherClient::new("http://127.0.0.1:1").unwrap();
    let err = client.fetch_snapshot().await.unwrap_err();

    assert!(matches!(err, WatcherError::Transport(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_transport_error_exhausts_retries() {
    let config = WatcherClientConfig::new("http://127.0.0.1:1")
        .with_retry(fast_retry(3))
        .with_timeout(Duration::from_secs(1));
    let client = WatcherClient::with_config(config).unwrap();

    let err = client.fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, WatcherError::Transport(_)));
}

/// Read one request head and answer it with `body`
async fn serve_snapshot(mut stream: TcpStream, body: &str) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Listener that drops its first connection and serves SNAPSHOT afterwards
async fn flaky_watcher() -> (String, Arc<AtomicUsize>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    let handle = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                drop(stream);
                continue;
            }
            serve_snapshot(stream, SNAPSHOT).await;
        }
    });

    (address, connections, handle)
}

#[tokio::test]
async fn test_retry_recovers_after_dropped_connection() {
    let (address, connections, server) = flaky_watcher().await;

    let config = WatcherClientConfig::new(address).with_retry(fast_retry(2));
    let client = WatcherClient::with_config(config).unwrap();
    let snapshot = client.fetch_snapshot().await.unwrap();

    assert_eq!(connections.load(Ordering::SeqCst), 2);
    assert_eq!(snapshot.node_count(), 2);
    server.abort();
}

#[tokio::test]
async fn test_single_attempt_surfaces_dropped_connection() {
    let (address, connections, server) = flaky_watcher().await;

    let client = WatcherClient::new(&address).unwrap();
    let err = client.fetch_snapshot().await.unwrap_err();

    assert!(matches!(err, WatcherError::Transport(_)));
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    server.abort();
}

#[tokio::test]
async fn test_silent_watcher_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            // Keep the socket open without ever answering
            held.push(stream);
        }
    });

    let config = WatcherClientConfig::new(address).with_timeout(Duration::from_millis(200));
    let client = WatcherClient::with_config(config).unwrap();
    let err = client.fetch_snapshot().await.unwrap_err();

    match err {
        WatcherError::Transport(e) => assert!(e.is_timeout(), "expected timeout, got {e}"),
        other => panic!("expected Transport, got {other:?}"),
    }
    server.abort();
}

#[test]
fn test_invalid_address() {
    let err = WatcherClient::new("not a url").err().unwrap();
    assert!(matches!(err, WatcherError::InvalidAddress { .. }));
}

#[test]
fn test_client_config_defaults() {
    let config = WatcherClientConfig::new("http://load-watcher:2020");
    assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    assert_eq!(config.timeout, Duration::from_secs(10));
    assert_eq!(config.retry.max_attempts, 1);

    let client = WatcherClient::with_config(config).unwrap();
    assert_eq!(client.url().as_str(), "http://load-watcher:2020/watcher");
}

//! BuiltWith client against a loopback HTTP responder.

mod common;

use std::time::Duration;

use mailscope_core::TechStackLookup;
use mailscope_probes::BuiltWithClient;

const TIMEOUT: Duration = Duration::from_secs(5);

fn client(port: u16) -> BuiltWithClient {
    BuiltWithClient::with_base_url(format!("http://127.0.0.1:{port}")).unwrap()
}

#[tokio::test]
async fn successful_lookup_is_normalized() {
    let body = r#"{
        "Results": [{"Result": {"Paths": [{"Technologies": [
            {"Name": "jQuery 3.6.0", "Categories": ["JavaScript Library"]},
            {"Name": "jQuery 1.12.4", "Categories": ["JavaScript Library"]},
            {"Name": "nginx", "Categories": ["Web Server"]}
        ]}]}}],
        "Errors": []
    }"#;
    let (port, request) = common::http_once(200, body).await;

    let stack = client(port)
        .lookup("example.com", "test-key", TIMEOUT)
        .await
        .unwrap();

    assert_eq!(stack.domain, "example.com");
    assert_eq!(stack.total_detections, 3);
    assert_eq!(stack.group("jquery").map(|g| g.count), Some(2));

    let head = request.await.unwrap();
    let request_line = head.lines().next().unwrap();
    assert!(request_line.starts_with("GET /v21/api.json?"));
    assert!(request_line.contains("KEY=test-key"));
    assert!(request_line.contains("LOOKUP=example.com"));
}

#[tokio::test]
async fn server_error_is_http_status_failure() {
    let (port, _request) = common::http_once(500, r#"{"message":"upstream broke"}"#).await;

    let err = client(port)
        .lookup("example.com", "test-key", TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "http_status");
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("upstream broke"));
}

#[tokio::test]
async fn invalid_json_is_malformed() {
    let (port, _request) = common::http_once(200, "<html>not json</html>").await;

    let err = client(port)
        .lookup("example.com", "test-key", TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "malformed");
}

#[tokio::test]
async fn api_error_payload_fails_lookup() {
    let body = r#"{"Results": [], "Errors": [{"Message": "API key not recognised"}]}"#;
    let (port, _request) = common::http_once(200, body).await;

    let err = client(port)
        .lookup("example.com", "bad-key", TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "upstream");
    assert!(err.to_string().contains("API key not recognised"));
}

#[tokio::test]
async fn unresponsive_api_times_out() {
    let (port, _listener) = common::silent_listener().await;

    let err = client(port)
        .lookup("example.com", "test-key", Duration::from_millis(200))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "timeout");
}

#[tokio::test]
async fn refused_connection_does_not_leak_key() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = client(port)
        .lookup("example.com", "super-secret-key", TIMEOUT)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "http");
    assert!(!err.to_string().contains("super-secret-key"));
}

//! HTTP progress source tests against a mock upstream.

use badgeboard_domain::{SealedCredential, StudentId, SyncError};
use badgeboard_sync::{HttpProgressSource, ProgressSource};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_fetch_parses_progress_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/students/s-1/badges"))
        .and(header("authorization", "Bearer sealed-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"badge_id": "getting-started", "completed_at": "2026-08-01T10:00:00Z", "time_spent": 60},
            {"badge_id": "kubernetes", "completed_at": "2026-08-10T16:30:00Z", "time_spent": 240}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let source = HttpProgressSource::new(server.uri()).unwrap();
    let credential = SealedCredential::new("sealed-token");
    let progress = source
        .fetch_progress(&StudentId::new("s-1").unwrap(), Some(&credential))
        .await
        .unwrap();

    assert_eq!(progress.len(), 2);
    assert_eq!(progress[0].badge_id.as_str(), "getting-started");
    assert_eq!(progress[1].time_spent, 240);
}

#[tokio::test]
async fn test_server_error_is_retryable_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = HttpProgressSource::new(server.uri()).unwrap();
    let err = source
        .fetch_progress(&StudentId::new("s-1").unwrap(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Fetch(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_rate_limited_upstream_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let source = HttpProgressSource::new(server.uri()).unwrap();
    let err = source
        .fetch_progress(&StudentId::new("s-1").unwrap(), None)
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_error_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = HttpProgressSource::new(server.uri()).unwrap();
    let err = source
        .fetch_progress(&StudentId::new("ghost").unwrap(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MalformedPayload(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_invalid_json_is_permanent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let source = HttpProgressSource::new(server.uri()).unwrap();
    let err = source
        .fetch_progress(&StudentId::new("s-1").unwrap(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MalformedPayload(_)));
}

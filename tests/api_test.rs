//! Integration tests for the API
//!
//! No cluster is available in tests; probe submissions still have to come
//! back as structured results, and validation failures as 400s.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use netdiag_backend::{api::AppState, config::Config};

fn setup_app() -> axum::Router {
    let config = Config::default();
    let state = AppState::new(config);

    netdiag_backend::create_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_cluster_status_without_cluster() {
    let app = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cluster/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["connected"], false);
}

#[tokio::test]
async fn test_probe_empty_command_rejected() {
    let app = setup_app();

    let payload = json!({
        "kind": "connectivity",
        "namespace": "default",
        "command": []
    });

    let response = app.oneshot(post_json("/api/probes", &payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_probe_empty_namespace_rejected() {
    let app = setup_app();

    let payload = json!({
        "kind": "dns",
        "namespace": "",
        "command": ["sh", "-c", "true"]
    });

    let response = app.oneshot(post_json("/api/probes", &payload)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_probe_without_cluster_yields_structured_result() {
    let app = setup_app();

    let payload = json!({
        "kind": "connectivity",
        "namespace": "default",
        "command": ["sh", "-c", "echo CONNECTION_SUCCESS"],
        "timeout_seconds": 5
    });

    let response = app.oneshot(post_json("/api/probes", &payload)).await.unwrap();

    // Well-formed request: always a ProbeResult, never an HTTP error
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["output"], "");
    assert!(json["error"].as_str().unwrap().contains("not available"));
    assert!(json["duration_ms"].is_u64());
}

#[tokio::test]
async fn test_connectivity_check_rejects_shell_metacharacters() {
    let app = setup_app();

    let payload = json!({
        "host": "example.com; rm -rf /",
        "port": 80
    });

    let response = app
        .oneshot(post_json("/api/diagnostics/connectivity", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_connectivity_check_rejects_port_zero() {
    let app = setup_app();

    let payload = json!({
        "host": "example.com",
        "port": 0
    });

    let response = app
        .oneshot(post_json("/api/diagnostics/connectivity", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dns_check_without_cluster_has_no_verdict() {
    let app = setup_app();

    let payload = json!({
        "host": "kubernetes.default.svc"
    });

    let response = app
        .oneshot(post_json("/api/diagnostics/dns", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    // Probe could not run, so no reachable verdict is offered
    assert!(json.get("reachable").is_none());
    assert_eq!(json["probe"]["success"], false);
}

#[tokio::test]
async fn test_http_check_rejects_non_http_scheme() {
    let app = setup_app();

    let payload = json!({
        "url": "ftp://example.com/file"
    });

    let response = app
        .oneshot(post_json("/api/diagnostics/http", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_network_policies_without_cluster() {
    let app = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/cluster/network-policies")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = setup_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

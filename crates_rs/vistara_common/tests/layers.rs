use axum::body::Body;
use axum::http::{header::HeaderName, Request, StatusCode};
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;
use vistara_common::host_guard::AllowedHostsLayer;
use vistara_common::request_id::RequestIdLayer;

#[tokio::test]
async fn request_id_sets_header_when_missing() {
    let app = Router::new()
        .route("/x", get(|| async { "ok" }))
        .layer(RequestIdLayer::new(HeaderName::from_static("x-request-id")));

    let resp = app
        .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let rid = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert_eq!(rid.len(), 32);
    assert!(rid.chars().all(|c| c.is_ascii_hexdigit()));
}

#[tokio::test]
async fn request_id_preserves_existing_header() {
    let app = Router::new()
        .route("/x", get(|| async { "ok" }))
        .layer(RequestIdLayer::new(HeaderName::from_static("x-request-id")));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/x")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let rid = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert_eq!(rid, "abc-123");
}

#[tokio::test]
async fn request_id_replaces_garbage_inbound_id() {
    let app = Router::new()
        .route("/x", get(|| async { "ok" }))
        .layer(RequestIdLayer::new(HeaderName::from_static("x-request-id")));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/x")
                .header("x-request-id", "not a valid id!!")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let rid = resp
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert_eq!(rid.len(), 32);
}

#[tokio::test]
async fn host_guard_blocks_unknown_hosts() {
    let app = Router::new()
        .route("/x", get(|| async { "ok" }))
        .layer(AllowedHostsLayer::new(vec!["api.vistara.app".to_string()]));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/x")
                .header("host", "evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/x")
                .header("host", "api.vistara.app:443")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn host_guard_with_empty_allowlist_passes_through() {
    let app = Router::new()
        .route("/x", get(|| async { "ok" }))
        .layer(AllowedHostsLayer::new(Vec::new()));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/x")
                .header("host", "whatever.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

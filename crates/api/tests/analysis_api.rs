//! HTTP-level tests for `POST /api/ai/gemini/analyze-image`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, build_test_app_with, post_json, test_config, StubAnalyzer};
use serde_json::json;

const URI: &str = "/api/ai/gemini/analyze-image";

#[tokio::test]
async fn missing_image_is_a_validation_error() {
    let app = build_test_app();

    let response = post_json(app.router.clone(), URI, json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["message"], "`imageBase64` is required");
    assert_eq!(app.analyzer.call_count(), 0);
}

#[tokio::test]
async fn invalid_base64_is_rejected_before_analysis() {
    let app = build_test_app();

    let response = post_json(app.router.clone(), URI, json!({ "imageBase64": "***not base64***" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.analyzer.call_count(), 0);
}

#[tokio::test]
async fn data_url_prefix_is_stripped() {
    let app = build_test_app();

    let response = post_json(
        app.router.clone(),
        URI,
        json!({ "imageBase64": "data:image/png;base64,iVBORw0KGgo=" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["tag"], 4);
    assert_eq!(json["data"]["solution"], StubAnalyzer::report().solution);

    let calls = app.analyzer.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "iVBORw0KGgo=");
    assert_eq!(calls[0].1, "image/png");
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() {
    let app = build_test_app_with(test_config(), Some(StubAnalyzer::failing()));

    let response = post_json(app.router.clone(), URI, json!({ "imageBase64": "aW1hZ2U=" })).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "GEMINI_ERROR");
    assert_eq!(json["error"]["message"], "Failed to analyze image");
    assert!(!json.to_string().contains("upstream exploded"));
}

#[tokio::test]
async fn unconfigured_analyzer_is_unavailable() {
    let app = build_test_app_with(test_config(), None);

    let response = post_json(app.router.clone(), URI, json!({ "imageBase64": "aW1hZ2U=" })).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

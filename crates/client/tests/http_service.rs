use std::sync::Arc;

use assert_matches::assert_matches;
use axum::extract::Query;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Method;
use serde_json::{json, Value};
use vinxen_client::http::{FailureKind, RequestConfig};
use vinxen_client::storage::MemoryStorage;
use vinxen_client::{
    AnalysisApi, ErrorStatus, HttpError, HttpRefresher, HttpService, Schema, SchemaError,
    TokenManager,
};
use vinxen_core::auth::RefreshResponse;

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "data": data, "timestamp": "2026-01-01T00:00:00.000Z" }))
}

fn error_envelope(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "error": { "status": status.as_u16(), "code": code, "message": message },
            "timestamp": "2026-01-01T00:00:00.000Z"
        })),
    )
}

async fn refresh(headers: HeaderMap) -> axum::response::Response {
    let has_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("refreshToken=r-123"));
    if !has_cookie {
        return error_envelope(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "Refresh token required")
            .into_response();
    }
    envelope(json!({
        "accessToken": "fresh-access-token",
        "refreshToken": "r-124",
        "expiresIn": 900000
    }))
    .into_response()
}

fn app() -> Router {
    Router::new()
        .route(
            "/good",
            get(|| async {
                envelope(json!({
                    "accessToken": "aaaaaaaaaaaa",
                    "refreshToken": "r",
                    "expiresIn": 900000
                }))
            }),
        )
        .route(
            "/short-token",
            get(|| async {
                envelope(json!({ "accessToken": "short", "refreshToken": "r", "expiresIn": 900000 }))
            }),
        )
        .route(
            "/missing",
            get(|| async {
                let (status, body) = error_envelope(StatusCode::NOT_FOUND, "NOT_FOUND", "Post not found");
                let mut body = body.0;
                body["error"]["details"] = json!({ "id": 42 });
                (status, Json(body))
            }),
        )
        .route(
            "/plain-failure",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        )
        .route(
            "/echo",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                let content_type = headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                envelope(json!({ "received": body, "contentType": content_type }))
            }),
        )
        .route(
            "/query",
            get(|Query(params): Query<Value>| async move { envelope(params) }),
        )
        .route(
            "/auth/login",
            post(|| async {
                (
                    [(header::SET_COOKIE, "refreshToken=r-123; HttpOnly; Path=/; Max-Age=604800")],
                    envelope(json!({ "message": "ok" })),
                )
            }),
        )
        .route("/auth/refresh", get(refresh))
        .route(
            "/api/ai/gemini/analyze-image",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["imageBase64"], "iVBORw0KGgo=");
                envelope(json!({ "tag": 3, "message": "Loose cable", "solution": "Secure it" }))
            }),
        )
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn schema_validates_envelope_data() {
    let http = HttpService::new(spawn(app()).await).unwrap();
    let schema = Schema::<RefreshResponse>::validated("RefreshResponse");

    let ok = http.get("/good", Some(&schema)).await.unwrap();
    assert_eq!(ok.data.unwrap().access_token, "aaaaaaaaaaaa");
    assert_eq!(ok.timestamp, "2026-01-01T00:00:00.000Z");

    let err = http.get("/short-token", Some(&schema)).await.unwrap_err();
    assert_matches!(err, HttpError::Schema(SchemaError::Invalid { schema: "RefreshResponse", .. }));
}

#[tokio::test]
async fn without_schema_data_only_has_to_deserialize() {
    let http = HttpService::new(spawn(app()).await).unwrap();
    let res = http.get::<Value>("/short-token", None).await.unwrap();
    assert_eq!(res.data.unwrap()["accessToken"], "short");
}

#[tokio::test]
async fn error_envelopes_are_normalized() {
    let http = HttpService::new(spawn(app()).await).unwrap();

    let err = http.get::<Value>("/missing", None).await.unwrap_err();
    let HttpError::Communication(err) = err else {
        panic!("expected communication error");
    };
    assert_eq!(err.status, ErrorStatus::Code(404));
    assert_eq!(err.kind, FailureKind::Response);
    assert_eq!(err.message, "Post not found");
    assert_eq!(err.details, Some(json!({ "id": 42 })));
}

#[tokio::test]
async fn non_envelope_failures_use_the_status_reason() {
    let http = HttpService::new(spawn(app()).await).unwrap();
    let err = http.get::<Value>("/plain-failure", None).await.unwrap_err();
    assert_eq!(err.status_code(), Some(502));
    assert_matches!(err, HttpError::Communication(e) if e.message == "Bad Gateway");
}

#[tokio::test]
async fn bodies_and_params_are_sent_as_json() {
    let http = HttpService::new(spawn(app()).await).unwrap();

    let res = http
        .post::<Value, _>("/echo", &json!({ "title": "Ladder check" }), None)
        .await
        .unwrap();
    let data = res.data.unwrap();
    assert_eq!(data["received"]["title"], "Ladder check");
    assert_eq!(data["contentType"], "application/json");

    let res = http
        .request::<Value>(
            RequestConfig::new(Method::GET, "/query").param("page", "2").param("sort", "title"),
            None,
        )
        .await
        .unwrap();
    assert_eq!(res.data.unwrap(), json!({ "page": "2", "sort": "title" }));
}

#[tokio::test]
async fn unreachable_server_reports_no_response() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = HttpService::new(format!("http://{addr}")).unwrap();
    let err = http.get::<Value>("/anything", None).await.unwrap_err();
    let HttpError::Communication(err) = err else {
        panic!("expected communication error");
    };
    assert_eq!(err.status, ErrorStatus::Code(500));
    assert_eq!(err.kind, FailureKind::NoResponse);
}

#[tokio::test]
async fn unbuildable_requests_report_setup_errors() {
    let http = HttpService::new("http://127.0.0.1:9").unwrap();
    let err = http
        .request::<Value>(
            RequestConfig::new(Method::GET, "/x").header("bad header", "v"),
            None,
        )
        .await
        .unwrap_err();
    let HttpError::Communication(err) = err else {
        panic!("expected communication error");
    };
    assert_eq!(err.status, ErrorStatus::RequestSetup);
    assert_eq!(err.status.to_string(), "REQUEST_SETUP_ERROR");
    assert_eq!(err.kind, FailureKind::RequestSetup);
}

#[tokio::test]
async fn refresh_uses_the_cookie_set_at_login() {
    let http = HttpService::new(spawn(app()).await).unwrap();
    let manager = TokenManager::new(
        Arc::new(HttpRefresher::new(http.clone())),
        Arc::new(MemoryStorage::new()),
    );

    // No cookie yet: the server rejects the refresh.
    assert_eq!(manager.get_valid_access_token().await, None);

    http.post::<Value, _>("/auth/login", &json!({}), None).await.unwrap();
    assert_eq!(
        manager.get_valid_access_token().await.as_deref(),
        Some("fresh-access-token")
    );
}

#[tokio::test]
async fn analysis_strips_data_url_prefix() {
    let http = HttpService::new(spawn(app()).await).unwrap();
    let report = AnalysisApi::new(http)
        .analyze_image("data:image/png;base64,iVBORw0KGgo=")
        .await
        .unwrap();
    assert_eq!(report.tag, 3);
    assert_eq!(report.solution, "Secure it");
}

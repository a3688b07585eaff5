//! Tests for `AppError` -> HTTP response mapping.
//!
//! These call `IntoResponse` directly; no server is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use validator::Validate;
use vinxen_api::error::AppError;
use vinxen_core::auth::RegisterRequest;
use vinxen_core::error::CoreError;
use vinxen_db::crud::CrudError;
use vinxen_gemini::GeminiError;

async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Post",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["status"], 404);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "Post with id 42 not found");
    assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn forbidden_error_returns_403() {
    let (status, json) =
        error_to_response(AppError::Core(CoreError::Forbidden("not yours".into()))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn internal_errors_hide_details() {
    let (status, json) =
        error_to_response(AppError::InternalError("db password is hunter2".into())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["message"], "An internal error occurred");
    assert!(!json.to_string().contains("hunter2"));
}

#[tokio::test]
async fn validation_errors_carry_details() {
    let req = RegisterRequest {
        email: "bad".into(),
        password: "Str0ngPass".into(),
        name: "A".into(),
    };
    let errors = req.validate().unwrap_err();

    let (status, json) = error_to_response(AppError::from(errors)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"]["message"], "Valid email is required");
    assert!(json["error"]["details"]["email"].is_array());
}

#[tokio::test]
async fn unknown_crud_column_is_bad_request() {
    let err = AppError::Crud(CrudError::UnknownColumn {
        entity: "Post",
        column: "password".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"]["message"].as_str().unwrap().contains("password"));
}

#[tokio::test]
async fn analysis_failure_is_bad_gateway() {
    let (status, json) = error_to_response(AppError::Analysis(GeminiError::EmptyResponse)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "GEMINI_ERROR");
}

#[tokio::test]
async fn row_not_found_maps_to_404() {
    let (status, _) = error_to_response(AppError::Database(sqlx::Error::RowNotFound)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

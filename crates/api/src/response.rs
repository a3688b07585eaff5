//! Success half of the response envelope.
//!
//! Handlers return [`ApiJson`] so every body has the
//! `{ "data": ..., "timestamp": ... }` shape that the client runtime expects.

use axum::http::StatusCode;
use axum::Json;
use vinxen_core::envelope::ApiResponse;

/// `Json<ApiResponse<T>>`, the body type of every successful handler.
pub type ApiJson<T> = Json<ApiResponse<T>>;

/// 200 with `data`.
pub fn ok<T>(data: T) -> ApiJson<T> {
    Json(ApiResponse::success(data))
}

/// 201 with `data`.
pub fn created<T>(data: T) -> (StatusCode, ApiJson<T>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

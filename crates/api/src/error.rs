use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use validator::ValidationErrors;
use vinxen_core::envelope::{ApiErrorBody, ApiResponse};
use vinxen_core::error::CoreError;
use vinxen_core::validation::first_message;
use vinxen_db::crud::CrudError;
use vinxen_gemini::GeminiError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce the error half of the
/// [`ApiResponse`] envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `vinxen_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A CRUD generator error.
    #[error(transparent)]
    Crud(#[from] CrudError),

    /// The image analysis provider failed.
    #[error(transparent)]
    Analysis(#[from] GeminiError),

    /// Request body failed `validator` rules.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// The body was not valid JSON or did not match the expected shape.
    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error(transparent)]
    Path(#[from] PathRejection),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A feature that depends on missing configuration.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        AppError::Core(CoreError::Unauthorized(message.into()))
    }

    fn into_body(self) -> ApiErrorBody {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Storage ---
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::Crud(err) => match err {
                CrudError::UnknownColumn { .. }
                | CrudError::EmptyInput(_)
                | CrudError::MismatchedRows => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", err.to_string())
                }
                CrudError::Decode { .. } => {
                    tracing::error!(error = %err, "Row decode failed");
                    internal()
                }
                CrudError::Database(db) => classify_sqlx_error(db),
            },

            // --- Upstream ---
            AppError::Analysis(err) => {
                tracing::error!(error = %err, "Image analysis failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "GEMINI_ERROR",
                    "Failed to analyze image".to_string(),
                )
            }

            // --- Request shape ---
            AppError::Validation(errors) => {
                let details = serde_json::to_value(errors).ok();
                let body = ApiErrorBody::new(400, "VALIDATION_ERROR", first_message(errors));
                return match details {
                    Some(details) => body.with_details(details),
                    None => body,
                };
            }
            AppError::Json(rejection) => (
                rejection.status(),
                "INVALID_BODY",
                rejection.body_text(),
            ),
            AppError::Query(rejection) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text())
            }
            AppError::Path(rejection) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        ApiErrorBody::new(status.as_u16(), code, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = self.into_body();
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ApiResponse::<()>::failure(body))).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations (`23505`) on `uq_` constraints map to 409.
/// - Not-null (`23502`), foreign-key (`23503`) and bad-text (`22P02`) errors map to 400.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.code().as_deref() {
                Some("23505") if constraint.starts_with("uq_") => (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                ),
                Some("23502") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "A required field is missing".to_string(),
                ),
                Some("23503") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    format!("Referenced row does not exist: {constraint}"),
                ),
                Some("22P02") => (
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    "A field has an invalid value".to_string(),
                ),
                _ => {
                    tracing::error!(error = %db_err, "Database error");
                    internal()
                }
            }
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

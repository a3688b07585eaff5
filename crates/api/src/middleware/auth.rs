//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use vinxen_core::auth::TokenKind;
use vinxen_core::error::CoreError;
use vinxen_core::types::DbId;

use crate::auth::cookies::ACCESS_COOKIE;
use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated user extracted from an access token.
///
/// The token is read from the `accessToken` cookie first, then from an
/// `Authorization: Bearer` header. Only tokens tagged `access` are accepted.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<ApiJson<()>> {
///     tracing::info!(user_id = user.user_id, "handling request");
///     Ok(ok(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub email: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token(parts)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let payload = verify_token(&token, TokenKind::Access, &state.config.jwt)
            .map_err(|_| AppError::unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: payload.id,
            email: payload.email,
        })
    }
}

fn access_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    if let Some(cookie) = jar.get(ACCESS_COOKIE) {
        return Some(cookie.value().to_string());
    }
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Reject with 403 unless `user` owns the resource.
pub fn ensure_owner(owner_id: DbId, user: &AuthUser) -> Result<(), AppError> {
    if owner_id != user.user_id {
        return Err(AppError::Core(CoreError::Forbidden(
            "You do not own this resource".into(),
        )));
    }
    Ok(())
}

//! Handlers for the `/auth` resource (login, register, me, refresh, logout).
//!
//! Each mutating handler follows the same sequence: validate input, look up or
//! verify credentials, issue tokens, set both cookies, respond. A failure at
//! any step returns before the jar is touched.

use axum::extract::State;
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use vinxen_core::auth::{
    AuthResponse, LoginRequest, MessageResponse, RefreshResponse, RegisterRequest, TokenKind,
    UserPublic,
};
use vinxen_core::error::CoreError;
use vinxen_db::models::user::CreateUser;

use crate::auth::cookies::{clear_auth_cookies, set_auth_cookies, REFRESH_COOKIE};
use crate::auth::jwt::{issue_token_pair, verify_token};
use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::middleware::auth::AuthUser;
use crate::response::{created, ok, ApiJson};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /auth/login
///
/// Authenticate with email + password. Sets both token cookies and returns
/// the public user with the token pair.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(input): ValidatedJson<LoginRequest>,
) -> AppResult<(CookieJar, ApiJson<AuthResponse>)> {
    // 1. Find user by email. Unknown emails get the same answer as bad passwords.
    let user = state
        .users
        .find_by_email(&input.email)
        .await?
        .ok_or_else(|| AppError::unauthorized(INVALID_CREDENTIALS))?;

    // 2. Verify password.
    let password_valid = state
        .hasher
        .verify(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        tracing::info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    // 3. Issue tokens and set cookies.
    let tokens = issue_token_pair(user.id, &user.email, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let jar = set_auth_cookies(jar, &tokens, &state.config);

    tracing::info!(user_id = user.id, "User logged in");
    Ok((
        jar,
        ok(AuthResponse {
            user: user.to_public(),
            tokens,
        }),
    ))
}

/// POST /auth/register
///
/// Create an account. Duplicate emails are rejected with 409 before any
/// password hashing happens.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(input): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, CookieJar, ApiJson<AuthResponse>)> {
    if state.users.email_exists(&input.email).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "User already exists".into(),
        )));
    }

    let password_hash = state
        .hasher
        .hash(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = state
        .users
        .create(&CreateUser {
            email: input.email,
            name: input.name,
            password_hash,
        })
        .await?;

    let tokens = issue_token_pair(user.id, &user.email, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let jar = set_auth_cookies(jar, &tokens, &state.config);

    tracing::info!(user_id = user.id, "User registered");
    let (status, body) = created(AuthResponse {
        user: user.to_public(),
        tokens,
    });
    Ok((status, jar, body))
}

/// GET /auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<ApiJson<UserPublic>> {
    let user = state
        .users
        .find_by_id(auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;

    Ok(ok(user.to_public()))
}

/// GET /auth/refresh
///
/// Exchange the `refreshToken` cookie for a new token pair. Every failure is
/// a 401 so the client knows the session is gone.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, ApiJson<RefreshResponse>)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::unauthorized("Missing refresh token"))?;

    let payload = verify_token(&token, TokenKind::Refresh, &state.config.jwt).map_err(|e| {
        tracing::debug!(error = %e, "Refresh token rejected");
        AppError::unauthorized("Invalid or expired refresh token")
    })?;

    let user = state
        .users
        .find_by_id(payload.id)
        .await?
        .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;

    let tokens = issue_token_pair(user.id, &user.email, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let jar = set_auth_cookies(jar, &tokens, &state.config);

    let expires_in = state.config.jwt.ttl(TokenKind::Access).as_millis() as i64;
    Ok((
        jar,
        ok(RefreshResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in,
        }),
    ))
}

/// GET /auth/logout
///
/// Remove both cookies. Always succeeds.
pub async fn logout(jar: CookieJar) -> (CookieJar, ApiJson<MessageResponse>) {
    (
        clear_auth_cookies(jar),
        ok(MessageResponse {
            message: "Logged out successfully".into(),
        }),
    )
}

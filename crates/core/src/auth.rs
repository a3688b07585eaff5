//! Authentication request/response shapes and JWT payloads.
//!
//! Field names are camelCase on the wire so browser and Rust clients share a
//! single contract with the server.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::types::DbId;
use crate::validation::password_rule;

/// Request body for `POST /auth/login`.
///
/// Missing fields deserialize as empty strings so that they surface as
/// validation errors instead of body-parsing failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request body for `POST /auth/register`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(custom(function = "password_rule"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
}

/// Discriminates access tokens from refresh tokens inside a JWT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtPayload {
    pub id: DbId,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued-at (UTC Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiration (UTC Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
}

/// User projection that is safe to send to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserPublic {
    pub id: DbId,
    #[validate(email)]
    pub email: String,
    pub name: String,
}

/// Body returned by login and register.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthResponse {
    #[validate(nested)]
    pub user: UserPublic,
    pub tokens: AuthTokens,
}

/// Body returned by `GET /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[validate(length(min = 10))]
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in milliseconds, at most one year.
    #[validate(range(min = 1i64, max = 31_536_000_000i64))]
    pub expires_in: i64,
}

/// Body returned by `GET /auth/logout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_rejects_bad_email() {
        let req = LoginRequest {
            email: "not-an-email".into(),
            password: "whatever".into(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn refresh_lifetime_is_bounded() {
        let res = RefreshResponse {
            access_token: "aaaaaaaaaaaa".into(),
            refresh_token: "r".into(),
            expires_in: i64::MAX,
        };
        let errors = res.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("expires_in"));
    }

    #[test]
    fn login_requires_password() {
        let req = LoginRequest {
            email: "a@b.io".into(),
            password: String::new(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn register_applies_password_policy() {
        let req = RegisterRequest {
            email: "a@b.io".into(),
            password: "weakpass".into(),
            name: "A".into(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));

        let ok = RegisterRequest {
            password: "Str0ngPass".into(),
            ..req
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn token_kind_uses_type_key() {
        let payload = JwtPayload {
            id: 3,
            email: "a@b.io".into(),
            kind: TokenKind::Refresh,
            iat: None,
            exp: Some(10),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "refresh");
        assert!(json.get("iat").is_none());
    }

    #[test]
    fn refresh_response_rejects_short_token() {
        let res: RefreshResponse = serde_json::from_value(serde_json::json!({
            "accessToken": "short",
            "refreshToken": "r",
            "expiresIn": 900000
        }))
        .unwrap();
        assert!(res.validate().is_err());
    }
}

//! HS256 access and refresh tokens.
//!
//! Both kinds carry a [`JwtPayload`] and are signed with separate secrets. The
//! `type` claim is checked on verification, so an access token can never be
//! used to refresh and a refresh token can never authenticate a request.

use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use vinxen_core::auth::{AuthTokens, JwtPayload, TokenKind};
use vinxen_core::types::DbId;

/// Default access token lifetime.
const DEFAULT_ACCESS_EXPIRY: &str = "15m";
/// Default refresh token lifetime.
const DEFAULT_REFRESH_EXPIRY: &str = "7d";

/// Configuration for token issuing and verification.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret for access tokens.
    pub access_secret: String,
    /// Secret for refresh tokens.
    pub refresh_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_REFRESH_SECRET`       | **yes**  | --      |
    /// | `ACCESS_TOKEN_EXPIRES_IN`  | no       | `15m`   |
    /// | `REFRESH_TOKEN_EXPIRES_IN` | no       | `7d`    |
    ///
    /// # Panics
    ///
    /// Panics if a secret is missing or empty, or an expiry cannot be parsed.
    pub fn from_env() -> Self {
        let access_secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!access_secret.is_empty(), "JWT_SECRET must not be empty");

        let refresh_secret = std::env::var("JWT_REFRESH_SECRET")
            .expect("JWT_REFRESH_SECRET must be set in the environment");
        assert!(!refresh_secret.is_empty(), "JWT_REFRESH_SECRET must not be empty");

        let access_token_ttl = parse_duration(
            &std::env::var("ACCESS_TOKEN_EXPIRES_IN").unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY.into()),
        )
        .expect("ACCESS_TOKEN_EXPIRES_IN must look like 900, 30s, 15m, 12h or 7d");

        let refresh_token_ttl = parse_duration(
            &std::env::var("REFRESH_TOKEN_EXPIRES_IN")
                .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY.into()),
        )
        .expect("REFRESH_TOKEN_EXPIRES_IN must look like 900, 30s, 15m, 12h or 7d");

        Self {
            access_secret,
            refresh_secret,
            access_token_ttl,
            refresh_token_ttl,
        }
    }

    fn secret(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Access => self.access_secret.as_bytes(),
            TokenKind::Refresh => self.refresh_secret.as_bytes(),
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_token_ttl,
            TokenKind::Refresh => self.refresh_token_ttl,
        }
    }
}

/// Errors from token verification.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Bad signature, malformed token, or expired.
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The token verified but carries the other `type` tag.
    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },
}

/// Parse a lifetime like `900`, `30s`, `15m`, `12h` or `7d`.
///
/// A bare number is seconds. Returns `None` for anything else, including zero.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&value[..i], c),
        _ => (value, 's'),
    };
    let amount: u64 = digits.parse().ok()?;
    let secs = match unit {
        's' => amount,
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(3600)?,
        'd' => amount.checked_mul(86_400)?,
        _ => return None,
    };
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Sign a token of the given kind for a user.
pub fn issue_token(
    user_id: DbId,
    email: &str,
    kind: TokenKind,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + config.ttl(kind).as_secs() as i64;

    let payload = JwtPayload {
        id: user_id,
        email: email.to_string(),
        kind,
        iat: Some(now),
        exp: Some(exp),
    };

    encode(
        &Header::default(), // HS256
        &payload,
        &EncodingKey::from_secret(config.secret(kind)),
    )
}

/// Issue a fresh access/refresh pair with independent expiries.
pub fn issue_token_pair(
    user_id: DbId,
    email: &str,
    config: &JwtConfig,
) -> Result<AuthTokens, jsonwebtoken::errors::Error> {
    Ok(AuthTokens {
        access_token: issue_token(user_id, email, TokenKind::Access, config)?,
        refresh_token: issue_token(user_id, email, TokenKind::Refresh, config)?,
    })
}

/// Verify signature and expiry, then require the expected `type` tag.
pub fn verify_token(
    token: &str,
    expected: TokenKind,
    config: &JwtConfig,
) -> Result<JwtPayload, TokenError> {
    let data = decode::<JwtPayload>(
        token,
        &DecodingKey::from_secret(config.secret(expected)),
        &Validation::default(), // HS256, validates exp
    )?;

    if data.claims.kind != expected {
        return Err(TokenError::WrongKind { expected });
    }
    Ok(data.claims)
}

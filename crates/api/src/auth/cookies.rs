//! The auth cookie pair.
//!
//! `accessToken` and `refreshToken` are always written or removed together.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use vinxen_core::auth::{AuthTokens, TokenKind};

use crate::config::ServerConfig;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

fn auth_cookie(name: &'static str, value: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .build()
}

/// Add both token cookies to the jar.
pub fn set_auth_cookies(jar: CookieJar, tokens: &AuthTokens, config: &ServerConfig) -> CookieJar {
    let secure = config.secure_cookies();
    let access = auth_cookie(
        ACCESS_COOKIE,
        tokens.access_token.clone(),
        config.jwt.ttl(TokenKind::Access).as_secs(),
        secure,
    );
    let refresh = auth_cookie(
        REFRESH_COOKIE,
        tokens.refresh_token.clone(),
        config.jwt.ttl(TokenKind::Refresh).as_secs(),
        secure,
    );
    jar.add(access).add(refresh)
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .build();
    cookie.make_removal();
    cookie
}

/// Expire both token cookies.
///
/// Removal cookies are written even when the request carried none, so the
/// response always instructs the browser to drop them.
pub fn clear_auth_cookies(jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE))
}

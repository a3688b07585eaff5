use crate::auth::jwt::JwtConfig;

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            AppEnv::Production
        } else {
            AppEnv::Development
        }
    }
}

/// Runtime settings for the HTTP server.
///
/// Everything except the JWT secrets has a local-development default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API with credentials.
    pub cors_origins: Vec<String>,
    /// Requests running longer than this get a 408.
    pub request_timeout_secs: u64,
    /// Production turns on `Secure` cookies.
    pub environment: AppEnv,
    pub jwt: JwtConfig,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ServerConfig {
    /// Read `HOST` (`0.0.0.0`), `PORT` (`3000`), `CORS_ORIGINS`
    /// (`http://localhost:5173`, comma separated), `REQUEST_TIMEOUT_SECS`
    /// (`30`) and `APP_ENV` (`development`). JWT settings are read by
    /// [`JwtConfig::from_env`].
    pub fn from_env() -> Self {
        let cors_origins = env_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: env_or("PORT", "3000")
                .parse()
                .expect("PORT must be a port number"),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", "30")
                .parse()
                .expect("REQUEST_TIMEOUT_SECS must be a whole number of seconds"),
            environment: AppEnv::parse(&env_or("APP_ENV", "development")),
            jwt: JwtConfig::from_env(),
        }
    }

    /// Whether auth cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.environment == AppEnv::Production
    }
}

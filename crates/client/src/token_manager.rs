//! Keeps a short-lived access token fresh.
//!
//! A [`TokenManager`] caches the current access token with its expiry and
//! refreshes it through a [`TokenRefresher`] when it is missing or about to
//! lapse. Concurrent callers share a single in-flight refresh.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use vinxen_core::auth::RefreshResponse;

use crate::http::{
    into_data, CommunicationError, ErrorStatus, FailureKind, HttpError, HttpService,
    NO_RESPONSE_STATUS,
};
use crate::lock;
use crate::schema::Schema;
use crate::storage::{SameSite, SetOptions, StorageService};

/// A token is treated as expired this many milliseconds before its real expiry.
pub const EXPIRY_BUFFER_MS: i64 = 5_000;

/// Storage key under which the current access token is persisted.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Exchanges the refresh credential for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshResponse, HttpError>;
}

/// Refreshes against the API. The refresh token travels in the cookie the
/// server set at login, so the request itself carries no body.
pub struct HttpRefresher {
    http: HttpService,
    schema: Schema<RefreshResponse>,
}

impl HttpRefresher {
    pub fn new(http: HttpService) -> Self {
        Self {
            http,
            schema: Schema::validated("RefreshResponse"),
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self) -> Result<RefreshResponse, HttpError> {
        let response = self.http.get(REFRESH_PATH, Some(&self.schema)).await?;
        into_data(response)
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, Option<String>>>;

#[derive(Debug, Default)]
struct Session {
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

struct Inner {
    refresher: Arc<dyn TokenRefresher>,
    storage: Arc<dyn StorageService>,
    refresh_timeout: Option<Duration>,
    session: Mutex<Session>,
    in_flight: Mutex<Option<InFlight>>,
    listeners: Mutex<Vec<Listener>>,
}

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

/// Configures a [`TokenManager`] before it is shared.
pub struct TokenManagerBuilder {
    refresher: Arc<dyn TokenRefresher>,
    storage: Arc<dyn StorageService>,
    refresh_timeout: Option<Duration>,
}

impl TokenManagerBuilder {
    /// Give up on a refresh that takes longer than `timeout`.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> TokenManager {
        TokenManager {
            inner: Arc::new(Inner {
                refresher: self.refresher,
                storage: self.storage,
                refresh_timeout: self.refresh_timeout,
                session: Mutex::new(Session::default()),
                in_flight: Mutex::new(None),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl TokenManager {
    pub fn new(refresher: Arc<dyn TokenRefresher>, storage: Arc<dyn StorageService>) -> Self {
        Self::builder(refresher, storage).build()
    }

    pub fn builder(
        refresher: Arc<dyn TokenRefresher>,
        storage: Arc<dyn StorageService>,
    ) -> TokenManagerBuilder {
        TokenManagerBuilder {
            refresher,
            storage,
            refresh_timeout: None,
        }
    }

    /// Refresh once at startup. Returns whether a session was established.
    pub async fn initialize(&self) -> bool {
        self.refresh().await.is_some()
    }

    /// Seed the cache with a token obtained elsewhere, e.g. from login.
    pub fn set_session(&self, access_token: impl Into<String>, expires_at: DateTime<Utc>) {
        let mut session = lock(&self.inner.session);
        session.access_token = Some(access_token.into());
        session.expires_at = Some(expires_at);
    }

    pub fn clear_session(&self) {
        *lock(&self.inner.session) = Session::default();
    }

    /// The cached token, if it is still comfortably within its lifetime.
    pub fn cached_token(&self) -> Option<String> {
        let session = lock(&self.inner.session);
        let buffer = chrono::Duration::milliseconds(EXPIRY_BUFFER_MS);
        let fresh_until = session
            .expires_at
            .and_then(|expires_at| expires_at.checked_sub_signed(buffer))?;
        match &session.access_token {
            Some(token) if Utc::now() < fresh_until => Some(token.clone()),
            _ => None,
        }
    }

    pub async fn get_valid_access_token(&self) -> Option<String> {
        match self.cached_token() {
            Some(token) => Some(token),
            None => self.refresh().await,
        }
    }

    /// Register a callback fired when the server rejects the refresh
    /// credential with 401.
    pub fn on_auth_expired(&self, listener: impl Fn() + Send + Sync + 'static) {
        lock(&self.inner.listeners).push(Arc::new(listener));
    }

    /// Refresh the access token, joining any refresh already in flight.
    pub async fn refresh(&self) -> Option<String> {
        let in_flight = {
            let mut slot = lock(&self.inner.in_flight);
            match slot.as_ref() {
                Some(existing) => existing.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let result = inner.run_refresh().await;
                        *lock(&inner.in_flight) = None;
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        in_flight.await
    }
}

impl Inner {
    async fn run_refresh(&self) -> Option<String> {
        let outcome = match self.refresh_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.refresher.refresh()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(HttpError::Communication(timeout_error(limit))),
            },
            None => self.refresher.refresh().await,
        };

        match outcome.and_then(|refreshed| {
            let expires_at = expiry_from_now(refreshed.expires_in)?;
            Ok((refreshed, expires_at))
        }) {
            Ok((refreshed, expires_at)) => {
                {
                    let mut session = lock(&self.session);
                    session.access_token = Some(refreshed.access_token.clone());
                    session.expires_at = Some(expires_at);
                }
                let options = SetOptions {
                    path: Some("/".to_string()),
                    same_site: Some(SameSite::Lax),
                    ..SetOptions::default()
                };
                if let Err(e) = self
                    .storage
                    .set_value(
                        ACCESS_TOKEN_KEY,
                        Value::String(refreshed.access_token.clone()),
                        &options,
                    )
                    .await
                {
                    tracing::warn!(error = %e, "Failed to persist access token");
                }
                tracing::debug!(%expires_at, "Access token refreshed");
                Some(refreshed.access_token)
            }
            Err(err) => {
                *lock(&self.session) = Session::default();
                if err.status_code() == Some(401) {
                    if let Err(e) = self.storage.remove(ACCESS_TOKEN_KEY).await {
                        tracing::warn!(error = %e, "Failed to remove persisted access token");
                    }
                    self.notify_auth_expired();
                }
                tracing::error!(error = %err, "Token refresh failed");
                None
            }
        }
    }

    fn notify_auth_expired(&self) {
        // Listeners may register further listeners, so call them unlocked.
        let listeners = lock(&self.listeners).clone();
        for listener in listeners {
            listener();
        }
    }
}

fn expiry_from_now(expires_in_ms: i64) -> Result<DateTime<Utc>, HttpError> {
    chrono::Duration::try_milliseconds(expires_in_ms)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            HttpError::Communication(CommunicationError {
                message: format!("Token lifetime of {expires_in_ms}ms is out of range"),
                status: ErrorStatus::Code(NO_RESPONSE_STATUS),
                details: None,
                kind: FailureKind::Response,
            })
        })
}

fn timeout_error(limit: Duration) -> CommunicationError {
    CommunicationError {
        message: format!("Token refresh timed out after {}ms", limit.as_millis()),
        status: ErrorStatus::Code(NO_RESPONSE_STATUS),
        details: None,
        kind: FailureKind::NoResponse,
    }
}

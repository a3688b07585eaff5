//! Thin wrapper over `reqwest` that speaks the API envelope.
//!
//! Every transport failure is normalized into one [`CommunicationError`];
//! payloads that arrive but fail their [`Schema`] surface separately as
//! [`HttpError::Schema`]. Nothing is retried.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use vinxen_core::envelope::ApiResponse;

use crate::schema::{Schema, SchemaError};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Status reported when the server never answered.
pub const NO_RESPONSE_STATUS: u16 = 500;

/// Which stage of a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server answered with a non-success status.
    Response,
    /// The request went out but nothing usable came back.
    NoResponse,
    /// The request could not be built.
    RequestSetup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStatus {
    Code(u16),
    RequestSetup,
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorStatus::Code(code) => write!(f, "{code}"),
            ErrorStatus::RequestSetup => f.write_str("REQUEST_SETUP_ERROR"),
        }
    }
}

/// A transport-level failure in a uniform shape.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (status {status})")]
pub struct CommunicationError {
    pub message: String,
    pub status: ErrorStatus,
    pub details: Option<Value>,
    pub kind: FailureKind,
}

impl CommunicationError {
    fn response(status: u16, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            message: message.into(),
            status: ErrorStatus::Code(status),
            details,
            kind: FailureKind::Response,
        }
    }

    fn no_response(err: &reqwest::Error) -> Self {
        Self {
            message: format!("No response received from server: {err}"),
            status: ErrorStatus::Code(NO_RESPONSE_STATUS),
            details: None,
            kind: FailureKind::NoResponse,
        }
    }

    fn setup(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: ErrorStatus::RequestSetup,
            details: None,
            kind: FailureKind::RequestSetup,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self.status {
            ErrorStatus::Code(code) => Some(code),
            ErrorStatus::RequestSetup => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error(transparent)]
    Communication(#[from] CommunicationError),

    #[error("response failed schema validation: {0}")]
    Schema(#[from] SchemaError),

    #[error("response envelope carried no data")]
    MissingData,
}

impl HttpError {
    /// HTTP status of the failed response, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::Communication(err) => err.status_code(),
            _ => None,
        }
    }
}

/// One outgoing request. `url` is joined onto the service base URL unless it
/// is already absolute.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub url: String,
    pub method: Method,
    pub data: Option<Value>,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            data: None,
            params: Vec::new(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpService {
    /// Build a client with a 10 second timeout, JSON headers and a cookie
    /// store, so auth cookies set by the server ride along automatically.
    pub fn new(base_url: impl Into<String>) -> Result<Self, HttpError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .map_err(|e| CommunicationError::setup(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (shares its pool and cookies).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            url.trim_start_matches('/')
        )
    }

    /// Send `config` and decode the envelope.
    ///
    /// With a schema, present `data` must pass it; without one it only has to
    /// deserialize into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        config: RequestConfig,
        schema: Option<&Schema<T>>,
    ) -> Result<ApiResponse<T>, HttpError> {
        let mut builder = self
            .client
            .request(config.method, self.resolve(&config.url));
        if !config.params.is_empty() {
            builder = builder.query(&config.params);
        }
        for (name, value) in config.headers {
            builder = builder.header(name, value);
        }
        if let Some(data) = &config.data {
            builder = builder.json(data);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let request = builder
            .build()
            .map_err(|e| CommunicationError::setup(format!("Invalid request: {e}")))?;

        tracing::debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(error = %e, "Request got no response");
            CommunicationError::no_response(&e)
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| CommunicationError::response(status.as_u16(), e.to_string(), None))?;

        if !status.is_success() {
            let error = serde_json::from_slice::<ApiResponse<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error);
            let (message, details) = match error {
                Some(error) => (error.message, error.details),
                None => (
                    status.canonical_reason().unwrap_or("Request failed").to_string(),
                    None,
                ),
            };
            tracing::warn!(status = status.as_u16(), %message, "Request failed");
            return Err(CommunicationError::response(status.as_u16(), message, details).into());
        }

        let envelope: ApiResponse<Value> = serde_json::from_slice(&body).map_err(|e| {
            CommunicationError::response(status.as_u16(), format!("Malformed response body: {e}"), None)
        })?;
        let data = match envelope.data {
            Some(value) => Some(match schema {
                Some(schema) => schema.parse_value(value)?,
                None => serde_json::from_value(value).map_err(|source| SchemaError::Parse {
                    schema: std::any::type_name::<T>(),
                    source,
                })?,
            }),
            None => None,
        };

        Ok(ApiResponse {
            data,
            error: envelope.error,
            timestamp: envelope.timestamp,
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        schema: Option<&Schema<T>>,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.request(RequestConfig::new(Method::GET, url), schema).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        schema: Option<&Schema<T>>,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.request(with_body(Method::POST, url, body)?, schema).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        schema: Option<&Schema<T>>,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.request(with_body(Method::PUT, url, body)?, schema).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
        schema: Option<&Schema<T>>,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.request(with_body(Method::PATCH, url, body)?, schema).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        url: &str,
        schema: Option<&Schema<T>>,
    ) -> Result<ApiResponse<T>, HttpError> {
        self.request(RequestConfig::new(Method::DELETE, url), schema).await
    }
}

fn with_body<B: Serialize>(method: Method, url: &str, body: &B) -> Result<RequestConfig, HttpError> {
    let data = serde_json::to_value(body)
        .map_err(|e| CommunicationError::setup(format!("Unserializable request body: {e}")))?;
    Ok(RequestConfig::new(method, url).data(data))
}

/// Unwrap the payload of a success envelope.
pub fn into_data<T>(response: ApiResponse<T>) -> Result<T, HttpError> {
    response.data.ok_or(HttpError::MissingData)
}

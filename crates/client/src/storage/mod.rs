//! Key/value persistence for client-side state.
//!
//! Backends store [`serde_json::Value`]s so the trait stays object safe;
//! typed access goes through [`StorageExt`].

mod cookie;
mod file;
mod memory;

pub use cookie::{CookieStorage, SameSite};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored value has the wrong shape: {0}")]
    Serde(#[from] serde_json::Error),
}

/// When a stored entry stops being readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Relative to the moment of writing.
    After(Duration),
    At(DateTime<Utc>),
}

impl Expiry {
    pub fn resolve(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Expiry::After(ttl) => {
                let bound = if ttl < Duration::zero() {
                    DateTime::<Utc>::MIN_UTC
                } else {
                    DateTime::<Utc>::MAX_UTC
                };
                now.checked_add_signed(ttl).unwrap_or(bound)
            }
            Expiry::At(at) => at,
        }
    }
}

/// Per-write options. Backends ignore what they cannot express.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    pub path: Option<String>,
    pub expires: Option<Expiry>,
    pub same_site: Option<SameSite>,
    pub secure: bool,
}

impl SetOptions {
    pub fn expires_after(ttl: Duration) -> Self {
        Self {
            expires: Some(Expiry::After(ttl)),
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Read the raw value for `key`, or `None` if absent or expired.
    async fn get_value(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn set_value(&self, key: &str, value: Value, options: &SetOptions) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn clear(&self) -> Result<(), StorageError>;
}

/// Typed helpers over any [`StorageService`].
#[async_trait]
pub trait StorageExt: StorageService {
    async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_value(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        options: &SetOptions,
    ) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, value, options).await
    }
}

impl<S: StorageService + ?Sized> StorageExt for S {}

/// Interpret stored text as JSON, falling back to a plain string.
pub(crate) fn decode_stored(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

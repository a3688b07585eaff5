//! Client runtime for the vinxen API.
//!
//! Wraps the HTTP surface in [`HttpService`], keeps a short-lived access
//! token fresh through [`TokenManager`], and exposes WebSocket wrappers for
//! realtime traffic. Storage backends are pluggable through
//! [`StorageService`].

pub mod api;
pub mod codec;
pub mod http;
pub mod realtime;
pub mod schema;
pub mod storage;
pub mod token_manager;

pub use api::{AnalysisApi, AuthApi};
pub use http::{CommunicationError, ErrorStatus, FailureKind, HttpError, HttpService, RequestConfig};
pub use schema::{Schema, SchemaError};
pub use storage::{StorageError, StorageExt, StorageService};
pub use token_manager::{HttpRefresher, TokenManager, TokenManagerBuilder, TokenRefresher};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

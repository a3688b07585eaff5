use std::sync::Arc;

use vinxen_db::store::UserStore;
use vinxen_gemini::ImageAnalyzer;

use crate::auth::password::CredentialHasher;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (CRUD routes and health).
    pub pool: vinxen_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// User lookups for the auth routes.
    pub users: Arc<dyn UserStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    /// `None` when no analysis provider is configured.
    pub analyzer: Option<Arc<dyn ImageAnalyzer>>,
}

pub mod analysis;
pub mod auth;
pub mod health;
pub mod posts;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ai/gemini/analyze-image        POST  image hazard analysis
///
/// /posts                          GET   list (public), POST create (auth)
/// /posts/{id}                     GET   (public), PATCH / DELETE (author only)
/// ```
///
/// `/auth` and `/health` are mounted at the root by [`crate::router`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/ai", analysis::router())
        .nest("/posts", posts::router())
}

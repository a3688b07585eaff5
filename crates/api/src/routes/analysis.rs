use axum::routing::post;
use axum::Router;

use crate::handlers::analysis;
use crate::state::AppState;

/// Routes mounted at `/api/ai`.
pub fn router() -> Router<AppState> {
    Router::new().route("/gemini/analyze-image", post(analysis::analyze_image))
}

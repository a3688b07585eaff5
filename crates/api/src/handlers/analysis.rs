//! Handler for `POST /api/ai/gemini/analyze-image`.

use axum::extract::State;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use validator::Validate;
use vinxen_core::hazard::HazardReport;

use crate::error::{AppError, AppResult};
use crate::extract::ValidatedJson;
use crate::response::{ok, ApiJson};
use crate::state::AppState;

/// Mime type assumed when the payload has no data-URL prefix.
const DEFAULT_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeImageRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "`imageBase64` is required"))]
    pub image_base64: String,
}

/// Split an optional `data:<mime>;base64,` prefix off the payload.
pub fn split_data_url(input: &str) -> (&str, &str) {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix("data:") {
        if let Some((mime, payload)) = rest.split_once(";base64,") {
            let mime = if mime.is_empty() { DEFAULT_MIME_TYPE } else { mime };
            return (mime, payload);
        }
    }
    (DEFAULT_MIME_TYPE, input)
}

/// POST /api/ai/gemini/analyze-image
///
/// Accepts `{ "imageBase64": "..." }` (raw base64 or a data URL) and returns
/// the hazard report for the image.
pub async fn analyze_image(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<AnalyzeImageRequest>,
) -> AppResult<ApiJson<HazardReport>> {
    let (mime_type, payload) = split_data_url(&input.image_base64);

    let bytes = STANDARD
        .decode(payload)
        .map_err(|_| AppError::BadRequest("`imageBase64` must be valid base64".into()))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("`imageBase64` is empty".into()));
    }

    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Image analysis is not configured".into()))?;

    let report = analyzer.analyze(payload, mime_type).await?;
    tracing::info!(
        tag = report.tag,
        bytes = bytes.len(),
        mime_type,
        "Image analyzed",
    );
    Ok(ok(report))
}

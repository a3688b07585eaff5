//! Image hazard analysis backed by the Gemini `generateContent` REST API.
//!
//! The API server depends only on the [`ImageAnalyzer`] trait; [`GeminiClient`]
//! is the production implementation.

pub mod client;
pub mod config;
pub mod wire;

pub use client::GeminiClient;
pub use config::GeminiConfig;

use vinxen_core::hazard::HazardReport;

/// Errors from the analysis layer.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The API answered but produced no candidate text.
    #[error("Gemini returned no content")]
    EmptyResponse,

    /// The model text was not the expected JSON document.
    #[error("Failed to parse model output: {0}")]
    Parse(String),
}

/// Classifies an image into a [`HazardReport`].
#[async_trait::async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// Analyze base64-encoded image bytes (no data-URL prefix).
    async fn analyze(&self, image_base64: &str, mime_type: &str)
        -> Result<HazardReport, GeminiError>;
}

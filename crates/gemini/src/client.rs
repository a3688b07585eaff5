//! REST client for the Gemini `generateContent` endpoint.

use std::time::Duration;

use vinxen_core::hazard::HazardReport;

use crate::config::GeminiConfig;
use crate::wire::{parse_report, GenerateContentRequest, GenerateContentResponse};
use crate::{GeminiError, ImageAnalyzer};

/// HTTP client for one Gemini model.
pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Reuse an existing [`reqwest::Client`] (shares its connection pool).
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GeminiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

#[async_trait::async_trait]
impl ImageAnalyzer for GeminiClient {
    async fn analyze(
        &self,
        image_base64: &str,
        mime_type: &str,
    ) -> Result<HazardReport, GeminiError> {
        let request = GenerateContentRequest::for_image(image_base64, mime_type);
        let response = self.generate(&request).await?;
        let text = response.text().ok_or(GeminiError::EmptyResponse)?;

        let report = parse_report(&text)?;
        tracing::debug!(
            model = %self.config.model,
            tag = report.tag,
            "Image analysis complete",
        );
        Ok(report)
    }
}

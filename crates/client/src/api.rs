//! Typed wrappers over the auth and analysis routes.

use serde::Serialize;
use vinxen_core::auth::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UserPublic};
use vinxen_core::hazard::HazardReport;

use crate::http::{into_data, HttpError, HttpService};
use crate::schema::Schema;

pub struct AuthApi {
    http: HttpService,
}

impl AuthApi {
    pub fn new(http: HttpService) -> Self {
        Self { http }
    }

    /// Log in. The server also sets the auth cookies on the shared client.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, HttpError> {
        Schema::<LoginRequest>::validated("LoginRequest").check(request)?;
        let schema = Schema::<AuthResponse>::validated("AuthResponse");
        into_data(self.http.post("/auth/login", request, Some(&schema)).await?)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, HttpError> {
        Schema::<RegisterRequest>::validated("RegisterRequest").check(request)?;
        let schema = Schema::<AuthResponse>::validated("AuthResponse");
        into_data(self.http.post("/auth/register", request, Some(&schema)).await?)
    }

    pub async fn me(&self) -> Result<UserPublic, HttpError> {
        let schema = Schema::<UserPublic>::validated("UserPublic");
        into_data(self.http.get("/auth/me", Some(&schema)).await?)
    }

    pub async fn logout(&self) -> Result<MessageResponse, HttpError> {
        into_data(self.http.get("/auth/logout", None).await?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeImageBody<'a> {
    image_base64: &'a str,
}

pub struct AnalysisApi {
    http: HttpService,
}

impl AnalysisApi {
    pub fn new(http: HttpService) -> Self {
        Self { http }
    }

    /// Submit an image for hazard analysis. Accepts bare base64 or a
    /// `data:image/...;base64,` URL.
    pub async fn analyze_image(&self, image: &str) -> Result<HazardReport, HttpError> {
        let body = AnalyzeImageBody {
            image_base64: strip_image_data_url(image),
        };
        let schema = Schema::<HazardReport>::shape_only("HazardReport");
        into_data(
            self.http
                .post("/api/ai/gemini/analyze-image", &body, Some(&schema))
                .await?,
        )
    }
}

/// Strip a leading `data:image/<type>;base64,` prefix.
pub fn strip_image_data_url(image: &str) -> &str {
    let Some(rest) = image.strip_prefix("data:image/") else {
        return image;
    };
    // Matches `data:image/\w+;base64,`.
    let is_word = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    match rest.split_once(";base64,") {
        Some((kind, payload)) if is_word(kind) => payload,
        _ => image,
    }
}

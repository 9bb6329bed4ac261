//! Gemini `generateContent` client.
//!
//! ### Protocol
//!
//! - **Endpoints**:
//!   - API key: `https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent`
//!   - Vertex AI: `https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent`
//!     (`global` uses `aiplatform.googleapis.com`)
//! - **Authentication**: `x-goog-api-key` header, or `Authorization: Bearer` for Vertex AI
//!   (a fixed access token, or tokens minted from a service account key).
//! - **Errors**: 401/403 → auth, 429 → rate limited, other 4xx/5xx → HTTP error
//!   carrying the upstream `error.message`. No retries; callers decide.

mod auth;
pub mod error;
pub mod request;
pub mod response;

pub use error::GeminiError;
pub use request::{Content, GenerateRequest, GenerationConfig, InlineData, Modality, Part};
pub use response::{Candidate, GenerateResponse, PromptFeedback, UsageMetadata};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hairsim_core::{AppConfig, AuthSettings};
use hairsim_core::config::ConfigError;
use reqwest::header;

use auth::Authenticator;

/// Public Gemini API host.
const API_KEY_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default request timeout. Image generation is slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "hairsim/0.1";

/// Which configured model a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Face analysis and hairstyle suggestions (text out).
    Analysis,
    /// Hairstyle rendering (image out).
    Image,
}

/// Seam between the hairstyle operations and the remote model.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, GeminiError>;
}

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub auth: AuthSettings,
    pub analysis_model: String,
    pub image_model: String,
    /// Overrides the endpoint host (scheme + authority), mainly for tests.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl GeminiConfig {
    pub fn new(auth: AuthSettings) -> Self {
        Self {
            auth,
            analysis_model: "gemini-2.0-flash-lite".into(),
            image_model: "gemini-2.5-flash-image".into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }

    /// Build from application config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no credentials are configured.
    pub fn from_app(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            auth: config.require_auth()?,
            analysis_model: config.analysis_model.clone(),
            image_model: config.image_model.clone(),
            base_url: None,
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }

    fn model(&self, kind: ModelKind) -> &str {
        match kind {
            ModelKind::Analysis => &self.analysis_model,
            ModelKind::Image => &self.image_model,
        }
    }

    /// Full `generateContent` URL for the given model kind.
    pub fn endpoint(&self, kind: ModelKind) -> String {
        let model = self.model(kind);
        match &self.auth {
            AuthSettings::ApiKey(_) => {
                let base = self.base_url.as_deref().unwrap_or(API_KEY_BASE_URL);
                format!("{}/v1beta/models/{model}:generateContent", base.trim_end_matches('/'))
            }
            AuthSettings::Vertex { project_id, location, image_location, .. } => {
                let location = match kind {
                    ModelKind::Analysis => location,
                    ModelKind::Image => image_location,
                };
                let base = match &self.base_url {
                    Some(base) => base.trim_end_matches('/').to_string(),
                    None if location == "global" => "https://aiplatform.googleapis.com".to_string(),
                    None => format!("https://{location}-aiplatform.googleapis.com"),
                };
                format!(
                    "{base}/v1/projects/{project_id}/locations/{location}/publishers/google/models/{model}:generateContent"
                )
            }
        }
    }
}

/// Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    auth: Authenticator,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::InvalidRequest` for a malformed base URL and
    /// `GeminiError::Credentials` for an unusable service account key.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        if let Some(base) = &config.base_url {
            url::Url::parse(base).map_err(|e| GeminiError::InvalidRequest(format!("invalid base URL {base}: {e}")))?;
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| GeminiError::Network(Arc::new(e)))?;
        let auth = Authenticator::new(&config.auth)?;

        Ok(Self { http, auth, config })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

/// Classify an error response by status code.
fn classify_status(status: u16, body: &str) -> GeminiError {
    let message = error::error_message(body);
    match status {
        401 | 403 => GeminiError::AuthError(message),
        429 => GeminiError::RateLimited(message),
        code => GeminiError::HttpError { status: code, message },
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, kind: ModelKind, request: GenerateRequest) -> Result<GenerateResponse, GeminiError> {
        request.validate()?;

        let start = Instant::now();
        let url = self.config.endpoint(kind);
        tracing::debug!(model = self.config.model(kind), "calling generateContent");

        let http_response = self
            .auth
            .apply(self.http.post(&url))
            .await?
            .header(header::ACCEPT, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = http_response.status();
        tracing::debug!("generateContent response status: {}", status);

        if status.is_client_error() || status.is_server_error() {
            let body = http_response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let bytes = http_response.bytes().await?;
        let response: GenerateResponse =
            serde_json::from_slice(&bytes).map_err(|e| GeminiError::Parse(e.to_string()))?;

        if let Some(reason) = response.block_reason() {
            return Err(GeminiError::Blocked(reason.to_string()));
        }

        tracing::debug!("generateContent completed in {:?}, {} parts", start.elapsed(), response.parts().len());

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use hairsim_core::VertexCredential;

    use super::*;

    fn vertex(location: &str, image_location: &str) -> AuthSettings {
        AuthSettings::Vertex {
            project_id: "salon-demo".into(),
            location: location.into(),
            image_location: image_location.into(),
            credential: VertexCredential::AccessToken("token".into()),
        }
    }

    #[test]
    fn test_api_key_endpoint() {
        let config = GeminiConfig::new(AuthSettings::ApiKey("key".into()));
        assert_eq!(
            config.endpoint(ModelKind::Analysis),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-lite:generateContent"
        );
        assert!(config.endpoint(ModelKind::Image).contains("gemini-2.5-flash-image"));
    }

    #[test]
    fn test_vertex_endpoints() {
        let config = GeminiConfig::new(vertex("us-central1", "global"));
        assert_eq!(
            config.endpoint(ModelKind::Analysis),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/salon-demo/locations/us-central1/publishers/google/models/gemini-2.0-flash-lite:generateContent"
        );
        assert_eq!(
            config.endpoint(ModelKind::Image),
            "https://aiplatform.googleapis.com/v1/projects/salon-demo/locations/global/publishers/google/models/gemini-2.5-flash-image:generateContent"
        );
    }

    #[test]
    fn test_base_url_override() {
        let config = GeminiConfig {
            base_url: Some("http://127.0.0.1:9999/".into()),
            ..GeminiConfig::new(AuthSettings::ApiKey("key".into()))
        };
        assert!(config.endpoint(ModelKind::Image).starts_with("http://127.0.0.1:9999/v1beta/models/"));
    }

    #[test]
    fn test_from_app_config() {
        let app = AppConfig {
            gemini_api_key: Some("key".into()),
            image_model: "custom-image".into(),
            timeout_ms: 5_000,
            ..Default::default()
        };
        let config = GeminiConfig::from_app(&app).unwrap();
        assert_eq!(config.image_model, "custom-image");
        assert_eq!(config.timeout, Duration::from_secs(5));

        assert!(matches!(GeminiConfig::from_app(&AppConfig::default()), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_client_rejects_bad_base_url() {
        let config =
            GeminiConfig { base_url: Some("not a url".into()), ..GeminiConfig::new(AuthSettings::ApiKey("k".into())) };
        assert!(matches!(GeminiClient::new(config), Err(GeminiError::InvalidRequest(_))));
    }

    #[test]
    fn test_classify_auth_failures() {
        let body = r#"{"error":{"code":403,"message":"Permission denied on resource project salon-demo.","status":"PERMISSION_DENIED"}}"#;
        assert!(matches!(classify_status(403, body), GeminiError::AuthError(msg) if msg.contains("Permission denied")));
        assert!(matches!(classify_status(401, "unauthorized"), GeminiError::AuthError(msg) if msg == "unauthorized"));
    }

    #[test]
    fn test_classify_rate_limit() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(classify_status(429, body), GeminiError::RateLimited(msg) if msg.starts_with("Resource has been exhausted")));
    }

    #[test]
    fn test_classify_other_statuses_keep_upstream_message() {
        let body = r#"{"error":{"code":400,"message":"Image too large","status":"INVALID_ARGUMENT"}}"#;
        match classify_status(400, body) {
            GeminiError::HttpError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Image too large");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            classify_status(503, "  backend unavailable \n"),
            GeminiError::HttpError { status: 503, message } if message == "backend unavailable"
        ));
    }

    #[test]
    fn test_client_with_malformed_service_account() {
        let auth = AuthSettings::Vertex {
            project_id: "salon-demo".into(),
            location: "us-central1".into(),
            image_location: "global".into(),
            credential: VertexCredential::ServiceAccount(r#"{"type":"service_account"}"#.into()),
        };
        assert!(matches!(GeminiClient::new(GeminiConfig::new(auth)), Err(GeminiError::Credentials(_))));
    }

    #[test]
    fn test_config_debug_redacts_credentials() {
        let config = GeminiConfig::new(AuthSettings::ApiKey("super-secret".into()));
        assert!(!format!("{config:?}").contains("super-secret"));
    }
}

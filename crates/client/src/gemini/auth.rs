//! Request authentication for the Gemini endpoints.

use std::sync::Arc;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use hairsim_core::{AuthSettings, VertexCredential};
use reqwest::RequestBuilder;

use super::GeminiError;

/// OAuth scope covering Vertex AI.
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Attaches credentials to outgoing requests.
#[derive(Clone)]
pub(crate) enum Authenticator {
    ApiKey(String),
    Bearer(String),
    /// Mints bearer tokens from a service account key. The provider caches
    /// each token and refreshes it shortly before it expires.
    ServiceAccount(Arc<dyn TokenProvider>),
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("Authenticator::ApiKey([REDACTED])"),
            Self::Bearer(_) => f.write_str("Authenticator::Bearer([REDACTED])"),
            Self::ServiceAccount(_) => f.write_str("Authenticator::ServiceAccount"),
        }
    }
}

impl Authenticator {
    /// # Errors
    ///
    /// Returns `GeminiError::Credentials` if the service account key cannot be loaded.
    pub(crate) fn new(auth: &AuthSettings) -> Result<Self, GeminiError> {
        Ok(match auth {
            AuthSettings::ApiKey(key) => Self::ApiKey(key.clone()),
            AuthSettings::Vertex { credential: VertexCredential::AccessToken(token), .. } => {
                Self::Bearer(token.clone())
            }
            AuthSettings::Vertex { credential: VertexCredential::ServiceAccount(json), .. } => {
                let account = CustomServiceAccount::from_json(json)
                    .map_err(|e| GeminiError::Credentials(format!("invalid service account key: {e}")))?;
                Self::ServiceAccount(Arc::new(account))
            }
        })
    }

    pub(crate) async fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder, GeminiError> {
        match self {
            Self::ApiKey(key) => Ok(request.header("x-goog-api-key", key)),
            Self::Bearer(token) => Ok(request.bearer_auth(token)),
            Self::ServiceAccount(provider) => {
                let token = provider
                    .token(&[CLOUD_PLATFORM_SCOPE])
                    .await
                    .map_err(|e| GeminiError::AuthError(format!("could not mint a Vertex AI access token: {e}")))?;
                Ok(request.bearer_auth(token.as_str()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::AUTHORIZATION;

    use super::*;

    fn vertex(credential: VertexCredential) -> AuthSettings {
        AuthSettings::Vertex {
            project_id: "salon-demo".into(),
            location: "us-central1".into(),
            image_location: "global".into(),
            credential,
        }
    }

    async fn applied(auth: &AuthSettings) -> reqwest::Request {
        let request = reqwest::Client::new().post("https://example.com/v1/models/m:generateContent");
        Authenticator::new(auth).unwrap().apply(request).await.unwrap().build().unwrap()
    }

    #[tokio::test]
    async fn test_api_key_header() {
        let request = applied(&AuthSettings::ApiKey("key-123".into())).await;
        assert_eq!(request.headers()["x-goog-api-key"], "key-123");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_access_token_is_bearer() {
        let request = applied(&vertex(VertexCredential::AccessToken("ya29.token".into()))).await;
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer ya29.token");
        assert!(request.headers().get("x-goog-api-key").is_none());
    }

    #[test]
    fn test_malformed_service_account_is_credentials_error() {
        let json = r#"{"type":"service_account","project_id":"salon-demo"}"#;
        let err = Authenticator::new(&vertex(VertexCredential::ServiceAccount(json.into()))).unwrap_err();
        assert!(matches!(&err, GeminiError::Credentials(msg) if msg.contains("service account")));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let auth = Authenticator::new(&AuthSettings::ApiKey("super-secret".into())).unwrap();
        assert!(!format!("{auth:?}").contains("super-secret"));
    }
}

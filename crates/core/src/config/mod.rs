//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (HAIRSIM_*)
//! 2. TOML config file (if HAIRSIM_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (HAIRSIM_*)
/// 2. TOML config file (if HAIRSIM_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API key for the public generative language endpoint.
    ///
    /// Set via HAIRSIM_GEMINI_API_KEY environment variable.
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Google Cloud project for Vertex AI.
    ///
    /// Set via HAIRSIM_GCP_PROJECT_ID environment variable.
    #[serde(default)]
    pub gcp_project_id: Option<String>,

    /// Service account key JSON. Vertex AI bearer tokens are minted from it,
    /// and its `project_id` is the fallback for `gcp_project_id`.
    ///
    /// Set via HAIRSIM_GCP_CREDENTIALS_JSON environment variable.
    #[serde(default)]
    pub gcp_credentials_json: Option<String>,

    /// Pre-minted OAuth access token for Vertex AI. Takes precedence over the
    /// service account key.
    ///
    /// Set via HAIRSIM_GCP_ACCESS_TOKEN environment variable.
    #[serde(default)]
    pub gcp_access_token: Option<String>,

    /// Vertex AI region for face analysis calls.
    #[serde(default = "default_gcp_location")]
    pub gcp_location: String,

    /// Vertex AI region for image generation calls.
    #[serde(default = "default_image_location")]
    pub image_location: String,

    /// Model used to analyze faces and suggest hairstyles.
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,

    /// Model used to render hairstyle images.
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// How long a cached result stays valid, in seconds.
    ///
    /// Set via HAIRSIM_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Optional upper bound on cached results per store. Unbounded when unset.
    ///
    /// Set via HAIRSIM_CACHE_MAX_ENTRIES environment variable.
    #[serde(default)]
    pub cache_max_entries: Option<usize>,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via HAIRSIM_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Number of preset thumbnails rendered at once by the batch operation.
    ///
    /// Set via HAIRSIM_PRESET_CONCURRENCY environment variable.
    #[serde(default = "default_preset_concurrency")]
    pub preset_concurrency: usize,

    /// Directory receiving generated preset thumbnails.
    ///
    /// Set via HAIRSIM_PRESET_OUTPUT_DIR environment variable.
    #[serde(default = "default_preset_output_dir")]
    pub preset_output_dir: PathBuf,

    /// User-Agent string for upstream requests.
    ///
    /// Set via HAIRSIM_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_gcp_location() -> String {
    "us-central1".into()
}

fn default_image_location() -> String {
    "global".into()
}

fn default_analysis_model() -> String {
    "gemini-2.0-flash-lite".into()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".into()
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_timeout_ms() -> u64 {
    120_000
}

fn default_preset_concurrency() -> usize {
    2
}

fn default_preset_output_dir() -> PathBuf {
    PathBuf::from("./frontend/images/presets")
}

fn default_user_agent() -> String {
    "hairsim/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gcp_project_id: None,
            gcp_credentials_json: None,
            gcp_access_token: None,
            gcp_location: default_gcp_location(),
            image_location: default_image_location(),
            analysis_model: default_analysis_model(),
            image_model: default_image_model(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: None,
            timeout_ms: default_timeout_ms(),
            preset_concurrency: default_preset_concurrency(),
            preset_output_dir: default_preset_output_dir(),
            user_agent: default_user_agent(),
        }
    }
}

/// Credentials resolved for the generative API.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthSettings {
    /// Public Gemini endpoint authenticated with an API key.
    ApiKey(String),
    /// Vertex AI endpoint authenticated with a bearer token.
    Vertex { project_id: String, location: String, image_location: String, credential: VertexCredential },
}

/// Source of the Vertex AI bearer token.
#[derive(Clone, PartialEq, Eq)]
pub enum VertexCredential {
    /// Fixed token, e.g. from `gcloud auth print-access-token`.
    AccessToken(String),
    /// Service account key JSON; tokens are minted and refreshed from it.
    ServiceAccount(String),
}

impl std::fmt::Debug for VertexCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("VertexCredential::AccessToken([REDACTED])"),
            Self::ServiceAccount(_) => f.write_str("VertexCredential::ServiceAccount([REDACTED])"),
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("AuthSettings::ApiKey([REDACTED])"),
            Self::Vertex { project_id, location, image_location, credential } => f
                .debug_struct("AuthSettings::Vertex")
                .field("project_id", project_id)
                .field("location", location)
                .field("image_location", image_location)
                .field("credential", credential)
                .finish(),
        }
    }
}

impl AuthSettings {
    /// Short label for status reporting.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api_key",
            Self::Vertex { credential: VertexCredential::AccessToken(_), .. } => "vertex",
            Self::Vertex { credential: VertexCredential::ServiceAccount(_), .. } => "vertex_service_account",
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `HAIRSIM_`
    /// 2. TOML file from `HAIRSIM_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("HAIRSIM_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("HAIRSIM_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Project id from explicit config, falling back to the service account JSON.
    pub fn resolved_project_id(&self) -> Option<String> {
        if let Some(id) = self.gcp_project_id.as_deref().filter(|id| !id.is_empty()) {
            return Some(id.to_string());
        }

        let raw = self.gcp_credentials_json.as_deref()?;
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(creds) => creds["project_id"].as_str().map(String::from),
            Err(e) => {
                tracing::warn!(error = %e, "gcp_credentials_json is not valid JSON; ignoring it");
                None
            }
        }
    }

    /// Whether enough configuration exists to reach the generative API.
    pub fn is_api_configured(&self) -> bool {
        self.require_auth().is_ok()
    }

    /// Resolve upstream credentials (for deferred validation).
    ///
    /// An API key wins over Vertex settings when both are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if neither an API key nor a Vertex
    /// project with an access token or service account key is configured.
    pub fn require_auth(&self) -> Result<AuthSettings, ConfigError> {
        if let Some(key) = self.gemini_api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(AuthSettings::ApiKey(key.to_string()));
        }

        let project_id = self.resolved_project_id().ok_or_else(|| ConfigError::Missing {
            field: "gcp_project_id".into(),
            hint: "Set HAIRSIM_GEMINI_API_KEY or HAIRSIM_GCP_PROJECT_ID".into(),
        })?;

        let credential = match (
            self.gcp_access_token.as_deref().filter(|t| !t.is_empty()),
            self.service_account_json(),
        ) {
            (Some(token), _) => VertexCredential::AccessToken(token.to_string()),
            (None, Some(json)) => VertexCredential::ServiceAccount(json.to_string()),
            (None, None) => {
                return Err(ConfigError::Missing {
                    field: "gcp_access_token".into(),
                    hint: "Set HAIRSIM_GCP_CREDENTIALS_JSON to a service account key, or \
                           HAIRSIM_GCP_ACCESS_TOKEN (e.g. from `gcloud auth print-access-token`)"
                        .into(),
                });
            }
        };

        Ok(AuthSettings::Vertex {
            project_id,
            location: self.gcp_location.clone(),
            image_location: self.image_location.clone(),
            credential,
        })
    }

    /// `gcp_credentials_json` when it holds a service account key.
    fn service_account_json(&self) -> Option<&str> {
        let raw = self.gcp_credentials_json.as_deref()?;
        let creds: serde_json::Value = serde_json::from_str(raw).ok()?;
        (creds["type"].as_str() == Some("service_account")).then_some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.gcp_location, "us-central1");
        assert_eq!(config.image_location, "global");
        assert_eq!(config.analysis_model, "gemini-2.0-flash-lite");
        assert_eq!(config.image_model, "gemini-2.5-flash-image");
        assert_eq!(config.cache_ttl_secs, 86_400);
        assert!(config.cache_max_entries.is_none());
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.preset_concurrency, 2);
        assert_eq!(config.preset_output_dir, PathBuf::from("./frontend/images/presets"));
        assert_eq!(config.user_agent, "hairsim/0.1");
        assert!(config.gemini_api_key.is_none());
        assert!(config.gcp_project_id.is_none());
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(120_000));
        assert_eq!(config.cache_ttl(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_require_auth_missing() {
        let config = AppConfig::default();
        let result = config.require_auth();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "gcp_project_id"));
        assert!(!config.is_api_configured());
    }

    #[test]
    fn test_require_auth_api_key() {
        let config = AppConfig { gemini_api_key: Some("test-key".into()), ..Default::default() };
        let auth = config.require_auth().unwrap();
        assert_eq!(auth, AuthSettings::ApiKey("test-key".into()));
        assert_eq!(auth.mode(), "api_key");
    }

    #[test]
    fn test_require_auth_api_key_wins_over_vertex() {
        let config = AppConfig {
            gemini_api_key: Some("test-key".into()),
            gcp_project_id: Some("proj".into()),
            gcp_access_token: Some("token".into()),
            ..Default::default()
        };
        assert!(matches!(config.require_auth(), Ok(AuthSettings::ApiKey(_))));
    }

    #[test]
    fn test_require_auth_vertex_needs_token() {
        let config = AppConfig { gcp_project_id: Some("proj".into()), ..Default::default() };
        let result = config.require_auth();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "gcp_access_token"));
    }

    #[test]
    fn test_require_auth_vertex() {
        let config = AppConfig {
            gcp_project_id: Some("proj".into()),
            gcp_access_token: Some("token".into()),
            ..Default::default()
        };
        match config.require_auth().unwrap() {
            AuthSettings::Vertex { project_id, location, image_location, credential } => {
                assert_eq!(project_id, "proj");
                assert_eq!(location, "us-central1");
                assert_eq!(image_location, "global");
                assert_eq!(credential, VertexCredential::AccessToken("token".into()));
            }
            other => panic!("unexpected auth: {other:?}"),
        }
    }

    #[test]
    fn test_project_id_from_credentials_json() {
        let config = AppConfig {
            gcp_credentials_json: Some(r#"{"type":"service_account","project_id":"from-json"}"#.into()),
            ..Default::default()
        };
        assert_eq!(config.resolved_project_id().as_deref(), Some("from-json"));

        let explicit = AppConfig { gcp_project_id: Some("explicit".into()), ..config };
        assert_eq!(explicit.resolved_project_id().as_deref(), Some("explicit"));
    }

    #[test]
    fn test_require_auth_service_account_only() {
        let json = r#"{"type":"service_account","project_id":"from-json","client_email":"sa@from-json.iam.gserviceaccount.com"}"#;
        let config = AppConfig { gcp_credentials_json: Some(json.into()), ..Default::default() };

        assert!(config.is_api_configured());
        let auth = config.require_auth().unwrap();
        assert_eq!(auth.mode(), "vertex_service_account");
        match auth {
            AuthSettings::Vertex { project_id, credential, .. } => {
                assert_eq!(project_id, "from-json");
                assert_eq!(credential, VertexCredential::ServiceAccount(json.into()));
            }
            other => panic!("unexpected auth: {other:?}"),
        }
    }

    #[test]
    fn test_access_token_overrides_service_account() {
        let config = AppConfig {
            gcp_credentials_json: Some(r#"{"type":"service_account","project_id":"p"}"#.into()),
            gcp_access_token: Some("token".into()),
            ..Default::default()
        };
        assert_eq!(config.require_auth().unwrap().mode(), "vertex");
    }

    #[test]
    fn test_non_service_account_json_is_not_a_credential() {
        let config = AppConfig {
            gcp_credentials_json: Some(r#"{"type":"authorized_user","project_id":"p"}"#.into()),
            ..Default::default()
        };
        assert!(matches!(config.require_auth(), Err(ConfigError::Missing { field, .. }) if field == "gcp_access_token"));
    }

    #[test]
    fn test_project_id_ignores_broken_json() {
        let config = AppConfig { gcp_credentials_json: Some("{not json".into()), ..Default::default() };
        assert!(config.resolved_project_id().is_none());
    }

    #[test]
    fn test_auth_debug_redacts_secrets() {
        let auth = AuthSettings::Vertex {
            project_id: "proj".into(),
            location: "us-central1".into(),
            image_location: "global".into(),
            credential: VertexCredential::AccessToken("super-secret".into()),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("proj"));
        assert!(!rendered.contains("super-secret"));
        assert!(!format!("{:?}", AuthSettings::ApiKey("super-secret".into())).contains("super-secret"));
        assert!(!format!("{:?}", VertexCredential::ServiceAccount("super-secret".into())).contains("super-secret"));
    }
}

//! Gemini API client error types.

use std::sync::Arc;

use hairsim_core::Error;

/// Errors from the Gemini `generateContent` client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeminiError {
    /// Request rejected before sending (no parts, bad base URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Credentials could not be loaded (e.g. a malformed service account key).
    #[error("invalid credentials: {0}")]
    Credentials(String),

    /// Authentication failed (bad API key or expired token).
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// Rate limited or quota exhausted.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// HTTP error response.
    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    /// The prompt was blocked by safety filters.
    #[error("prompt blocked: {0}")]
    Blocked(String),

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { GeminiError::Timeout } else { GeminiError::Network(Arc::new(err)) }
    }
}

impl From<GeminiError> for Error {
    fn from(err: GeminiError) -> Self {
        match err {
            GeminiError::InvalidRequest(msg) => Error::InvalidInput(msg),
            GeminiError::Credentials(msg) => Error::Configuration(msg),
            GeminiError::AuthError(msg) => Error::UpstreamAuth(msg),
            GeminiError::RateLimited(msg) => Error::UpstreamRateLimited(msg),
            GeminiError::Timeout => Error::UpstreamTimeout("generative API did not respond in time".into()),
            other => Error::compute_with("generative API call failed", other),
        }
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

//! Unified error types for hairsim.
//!
//! Every variant carries a stable code prefix so callers and logs can classify
//! failures without matching on message text.

use std::sync::Arc;

use rmcp::model::{ErrorCode, ErrorData as McpError};

use crate::config::ConfigError;

/// Boxed cause attached to compute failures.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Unified error types for the hairsim services.
///
/// The type is `Clone` because concurrent callers joined on one computation
/// all receive the same failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., missing face photo).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Image payload could not be decoded to bytes.
    #[error("DECODE_ERROR: {0}")]
    Decode(String),

    /// The external generation call failed or returned nothing usable.
    #[error("COMPUTE_FAILED: {message}")]
    Compute {
        message: String,
        #[source]
        cause: Option<Cause>,
    },

    /// Upstream rejected our credentials.
    #[error("UPSTREAM_AUTH_ERROR: {0}")]
    UpstreamAuth(String),

    /// Upstream rate limited the request.
    #[error("UPSTREAM_RATE_LIMITED: {0}")]
    UpstreamRateLimited(String),

    /// Upstream call timed out.
    #[error("UPSTREAM_TIMEOUT: {0}")]
    UpstreamTimeout(String),

    /// Required service configuration is absent or invalid.
    #[error("CONFIG_ERROR: {0}")]
    Configuration(String),

    /// Writing generated artifacts failed.
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),
}

impl Error {
    /// Compute failure without an underlying cause.
    pub fn compute(message: impl Into<String>) -> Self {
        Error::Compute { message: message.into(), cause: None }
    }

    /// Compute failure wrapping the error that caused it.
    pub fn compute_with(message: impl Into<String>, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Compute { message: message.into(), cause: Some(Arc::new(cause)) }
    }

    /// True for every failure of the external generation call.
    pub fn is_compute(&self) -> bool {
        matches!(
            self,
            Error::Compute { .. } | Error::UpstreamAuth(_) | Error::UpstreamRateLimited(_) | Error::UpstreamTimeout(_)
        )
    }

    /// True when an identical request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Compute { .. } | Error::UpstreamRateLimited(_) | Error::UpstreamTimeout(_))
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Configuration(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::Compute { .. } => (-32000, err.to_string()),
            Error::Storage(msg) => (-32002, msg.clone()),
            Error::Decode(msg) => (-32003, msg.clone()),
            Error::UpstreamTimeout(msg) => (-32006, msg.clone()),
            Error::UpstreamAuth(msg) => (-32009, msg.clone()),
            Error::UpstreamRateLimited(msg) => (-32010, msg.clone()),
            Error::Configuration(msg) => (-32011, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

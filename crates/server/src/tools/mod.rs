//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-hairsim server.

pub mod analyze;
pub mod presets;
pub mod render;
pub mod status;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Pretty-printed JSON text content, the shape every tool returns.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| McpError::internal_error(format!("Failed to serialize tool output: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Reject blank required image payloads before decoding.
pub(crate) fn require_payload<'a>(value: &'a str, what: &str) -> Result<&'a str, hairsim_core::Error> {
    if value.trim().is_empty() {
        return Err(hairsim_core::Error::InvalidInput(format!("{what} is required")));
    }
    Ok(value)
}

/// Decode an optional image payload; blank strings count as absent.
pub(crate) fn optional_image(
    value: Option<&str>,
) -> Result<Option<hairsim_core::DecodedImage>, hairsim_core::Error> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(hairsim_core::DecodedImage::from_payload)
        .transpose()
}

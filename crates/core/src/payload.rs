//! Image payload decoding.
//!
//! Clients send photos as base64 text, optionally wrapped in a data URI
//! (`data:image/jpeg;base64,...`). Everything downstream of this module,
//! fingerprinting included, works on the decoded bytes.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;

use crate::Error;
use crate::cache::{Fingerprint, fingerprint};

/// Marker separating a data URI header from its payload.
const BASE64_MARKER: &str = "base64,";

/// A decoded image with its sniffed format.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("mime_type", &self.mime_type())
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl DecodedImage {
    /// Decode a base64 payload, stripping any data URI header first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the payload is empty, is not valid base64,
    /// or does not contain a recognizable image.
    pub fn from_payload(payload: &str) -> Result<Self, Error> {
        let encoded = strip_data_uri(payload);
        let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if compact.is_empty() {
            return Err(Error::Decode("image payload is empty".into()));
        }

        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| Error::Decode(format!("invalid base64: {e}")))?;

        Self::from_bytes(bytes)
    }

    /// Wrap raw bytes, sniffing the image format from the magic number.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::Decode("image payload is empty".into()));
        }

        let format =
            image::guess_format(&bytes).map_err(|e| Error::Decode(format!("unrecognized image format: {e}")))?;

        Ok(Self { bytes, format })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type of the sniffed format (e.g. `image/png`).
    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    /// Content fingerprint over the decoded bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        fingerprint(&self.bytes)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn to_data_uri(&self) -> String {
        encode_data_uri(self.mime_type(), &self.bytes)
    }
}

/// Return the base64 part of a payload, dropping a data URI header if present.
pub fn strip_data_uri(payload: &str) -> &str {
    match payload.find(BASE64_MARKER) {
        Some(idx) => &payload[idx + BASE64_MARKER.len()..],
        None => payload.trim(),
    }
}

/// Build a `data:` URI for the given bytes.
pub fn encode_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

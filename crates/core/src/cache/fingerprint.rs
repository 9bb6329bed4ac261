//! Content-addressed cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;

/// Hex characters in a SHA-256 digest.
const DIGEST_LEN: usize = 64;

/// Number of hex characters exposed in client-facing ids.
const SHORT_LEN: usize = 32;

/// Hex-encoded SHA-256 digest used as the sole cache key.
///
/// Always 64 lowercase hex characters; deserialization rejects anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading half of the digest, used in client-facing ids.
    pub fn short(&self) -> &str {
        &self.0[..SHORT_LEN]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let is_digest = value.len() == DIGEST_LEN
            && value.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !is_digest {
            return Err(Error::InvalidInput(format!(
                "fingerprint must be {DIGEST_LEN} lowercase hex characters, got '{value}'"
            )));
        }
        Ok(Self(value))
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of decoded image bytes.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    Fingerprint(hex::encode(Sha256::digest(bytes)))
}

/// Compute a fingerprint over several segments.
///
/// Each segment is length-prefixed so that `["ab", "c"]` and `["a", "bc"]`
/// hash differently. A leading segment count keeps compound keys out of the
/// single-image key space.
pub fn fingerprint_parts<I, P>(parts: I) -> Fingerprint
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let parts: Vec<P> = parts.into_iter().collect();
    let mut hasher = Sha256::new();
    hasher.update(b"parts:");
    hasher.update((parts.len() as u64).to_le_bytes());
    for part in &parts {
        let part = part.as_ref();
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

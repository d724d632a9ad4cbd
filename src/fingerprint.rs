//! Request fingerprinting.
//!
//! A [`Fingerprint`] identifies semantically equivalent requests so the
//! result cache can serve them. The digest must be stable across processes
//! (entries may live in a shared Redis), so it uses SHA-256 rather than
//! `DefaultHasher`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::SummaryRequest;

/// Store key prefix for cached summaries.
const KEY_PREFIX: &str = "summary:";

/// Deterministic digest of a normalized [`SummaryRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a request.
    ///
    /// Text is trimmed and every whitespace run collapsed to a single
    /// space; language and tone use their canonical lowercase codes.
    /// Fields are separated by a unit separator so that no text can
    /// collide with a different field split.
    pub fn of(request: &SummaryRequest) -> Self {
        let text = normalize_text(&request.text);

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update([0x1f]);
        hasher.update(request.language.as_str().as_bytes());
        hasher.update([0x1f]);
        hasher.update(request.max_output_tokens.to_be_bytes());
        hasher.update([0x1f]);
        hasher.update(request.tone.as_str().as_bytes());

        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which the cached result is stored.
    pub fn cache_key(&self) -> String {
        format!("{KEY_PREFIX}{}", self.0)
    }

    /// First 12 hex chars, for logs.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim and collapse whitespace runs to a single space.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

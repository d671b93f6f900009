//! Resource versions and ETag handling.
//!
//! Versions are opaque strings surfaced as weak HTTP entity tags
//! (RFC 7232). Handlers may supply their own version scheme through
//! `meta.version`; [`ResourceVersion::from_content`] offers a
//! deterministic content hash for handlers that do not track versions
//! themselves.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// An opaque resource version.
///
/// Equality compares the opaque value only, regardless of whether either
/// side was parsed from a weak or strong ETag, which is the weak
/// comparison RFC 7232 prescribes for SCIM preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    /// Version from an opaque identifier such as a database sequence
    /// number or modification counter.
    pub fn new(opaque: impl Into<String>) -> Self {
        Self(opaque.into())
    }

    /// Deterministic version derived from resource content. The first
    /// eight bytes of a SHA-256 digest keep the resulting ETag short.
    pub fn from_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        Self(BASE64.encode(&digest[..8]))
    }

    /// The opaque value without ETag dressing.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a weak entity tag, e.g. `W/"3694e05e9dff590"`.
    pub fn to_etag(&self) -> String {
        format!("W/\"{}\"", self.0)
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_etag())
    }
}

impl FromStr for ResourceVersion {
    type Err = std::convert::Infallible;

    /// Accepts `W/"x"`, `"x"` and bare `x` forms.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let value = value.strip_prefix("W/").unwrap_or(value);
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        Ok(Self(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_versions_are_deterministic() {
        let a = ResourceVersion::from_content(b"{\"id\":\"1\"}");
        let b = ResourceVersion::from_content(b"{\"id\":\"1\"}");
        let c = ResourceVersion::from_content(b"{\"id\":\"2\"}");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parses_weak_strong_and_bare_forms() {
        let weak: ResourceVersion = "W/\"abc123\"".parse().unwrap();
        let strong: ResourceVersion = "\"abc123\"".parse().unwrap();
        let bare: ResourceVersion = "abc123".parse().unwrap();
        assert_eq!(weak, strong);
        assert_eq!(weak, bare);
    }

    #[test]
    fn etag_rendering_is_weak() {
        let version = ResourceVersion::new("3694e05e9dff590");
        assert_eq!(version.to_etag(), "W/\"3694e05e9dff590\"");
    }
}

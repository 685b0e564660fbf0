//! Core identifier and value types shared by every subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte content hash (SHA-256 by default; see `nimbus_block_store::HashAlgorithm`).
pub type Hash = [u8; 32];

/// Hex-encode a hash for wire/log representation.
pub fn hex_encode(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hex-decode a hash, failing `InvalidHash` on malformed input.
pub fn hex_decode(s: &str) -> Result<Hash, crate::CoreError> {
    if s.len() != 64 {
        return Err(crate::CoreError::InvalidHash(format!(
            "expected 64 hex chars, got {}",
            s.len()
        )));
    }
    let mut out = [0u8; 32];
    for i in 0..32 {
        let byte_str = &s[i * 2..i * 2 + 2];
        out[i] = u8::from_str_radix(byte_str, 16)
            .map_err(|_| crate::CoreError::InvalidHash(s.to_string()))?;
    }
    Ok(out)
}

/// Integer node identifier. Uniquely determines a path within non-deleted nodes.
pub type NodeId = u64;

/// Monotonic global id. Used both for version serials and commission serials
/// (see GLOSSARY: "Serial").
pub type Serial = u64;

/// Unix timestamp in seconds since epoch.
pub type Timestamp = i64;

/// An authenticated caller or resource owner, e.g. a user uuid or `"system"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// `true` for the wildcard principal used to mark a path public.
    pub fn is_public(&self) -> bool {
        self.0 == "*"
    }

    pub fn public() -> Self {
        Self("*".to_string())
    }

    /// `Some((owner, group))` if this principal is a `owner:groupname` group reference.
    pub fn as_group_ref(&self) -> Option<(&str, &str)> {
        self.0.split_once(':')
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// `(holder, source, resource)` — the key of a Quotaholder holding.
///
/// - `holder`: entity that owns the resource balance (typically a user).
/// - `source`: scope that backs the holder's resource (typically a project).
/// - `resource`: named quantified thing (`"diskspace"`, `"cpu"`, `"vm"`, …).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub holder: String,
    pub source: String,
    pub resource: String,
}

impl ResourceKey {
    pub fn new(holder: impl Into<String>, source: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            holder: holder.into(),
            source: source.into(),
            resource: resource.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.holder, self.source, self.resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let h: Hash = [0xAB; 32];
        let s = hex_encode(&h);
        assert_eq!(s.len(), 64);
        assert_eq!(hex_decode(&s).unwrap(), h);
    }

    #[test]
    fn hex_decode_rejects_bad_length() {
        assert!(hex_decode("abcd").is_err());
    }

    #[test]
    fn group_ref_parses() {
        let p = Principal::new("alice:developers");
        assert_eq!(p.as_group_ref(), Some(("alice", "developers")));
        assert_eq!(Principal::new("bob").as_group_ref(), None);
    }

    #[test]
    fn public_principal() {
        assert!(Principal::public().is_public());
        assert!(!Principal::new("alice").is_public());
    }
}

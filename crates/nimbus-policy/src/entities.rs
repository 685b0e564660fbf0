//! The policy map attached to a node (§4.5): quota, versioning mode, and
//! the project accounting scope a container's bytes are charged against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersioningMode {
    /// Overwrites retain the superseded version as HISTORY.
    Auto,
    /// Overwrites immediately purge the superseded NORMAL version.
    None,
}

impl VersioningMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(VersioningMode::Auto),
            "none" => Some(VersioningMode::None),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersioningMode::Auto => "auto",
            VersioningMode::None => "none",
        }
    }
}

/// The resolved policy for one node. `quota == 0` means unbounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub quota: u64,
    pub versioning: VersioningMode,
    pub project: String,
}

/// A partial update to a node's policy; `None` fields are left unchanged
/// unless `replace` is set, in which case absent fields fall back to
/// deployment defaults instead of the previous value.
#[derive(Debug, Clone, Default)]
pub struct PolicyPatch {
    pub quota: Option<u64>,
    pub versioning: Option<VersioningMode>,
    pub project: Option<String>,
}

/// Per-deployment fallbacks for keys a patch leaves unset (§6 Configuration).
#[derive(Debug, Clone)]
pub struct PolicyDefaults {
    pub default_quota: u64,
    pub default_versioning: VersioningMode,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            default_quota: 0,
            default_versioning: VersioningMode::Auto,
        }
    }
}

//! Façade-level configuration knobs (§6 "Configuration"). Block size, hash
//! algorithm, and node-tree statistics depth live with their owning crates;
//! this struct covers the knobs the façade itself interprets.

use nimbus_policy::VersioningMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacadeConfig {
    pub default_account_quota: u64,
    pub default_container_quota: u64,
    pub default_container_versioning: VersioningMode,
    /// When true, purged HISTORY never refunds quota — because HISTORY
    /// bytes were never counted as usage in the first place.
    pub free_versioning: bool,
    /// Seconds to wait before re-querying the block backend for an
    /// `available = false` version.
    pub map_check_interval: i64,
    pub public_url_security: usize,
    pub public_url_alphabet: String,
    pub listing_limit: usize,
    /// The Quotaholder resource name accounted objects are charged under.
    pub resource_name: String,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            default_account_quota: 0,
            default_container_quota: 0,
            default_container_versioning: VersioningMode::Auto,
            free_versioning: false,
            map_check_interval: 5,
            public_url_security: 16,
            public_url_alphabet: "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz".to_string(),
            listing_limit: 10_000,
            resource_name: "diskspace".to_string(),
        }
    }
}

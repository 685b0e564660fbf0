use serde::{Deserialize, Serialize};

/// Server-side cap on `latest_version_list`'s `limit` parameter (§4.3).
pub const LISTING_MAX_LIMIT: usize = 10_000;
/// Default `limit` when the caller does not specify one.
pub const LISTING_DEFAULT_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTreeConfig {
    /// How many ancestors above a mutated node get their `Statistics`
    /// updated synchronously on every version create/remove/recluster.
    /// Matches the "aggregated up to a configured depth" language in the
    /// data model rather than walking to the account root on every write.
    pub update_statistics_ancestors_depth: u32,
}

impl Default for NodeTreeConfig {
    fn default() -> Self {
        Self {
            update_statistics_ancestors_depth: 8,
        }
    }
}

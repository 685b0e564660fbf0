use nimbus_types::Timestamp;
use std::collections::HashSet;

use crate::entities::Cluster;

/// An equality predicate over one metadata attribute, used by
/// `latest_version_list` to filter by user/system metadata.
#[derive(Debug, Clone)]
pub struct AttributeFilter {
    pub domain: String,
    pub key: String,
    pub value: String,
}

/// Parameters to the listing workhorse (§4.3).
#[derive(Debug, Clone)]
pub struct ListingParams {
    pub prefix: String,
    pub delimiter: Option<char>,
    /// Exclusive pagination marker (a path).
    pub marker: Option<String>,
    pub limit: usize,
    /// Point-in-time cutoff; `None` means "now".
    pub before: Option<Timestamp>,
    pub exclude_cluster: Vec<Cluster>,
    /// When set, only nodes whose path is in this set are visible
    /// (the façade computes this from the Permission Index).
    pub allowed_paths: Option<HashSet<String>>,
    pub domain: Option<String>,
    pub attr_filters: Vec<AttributeFilter>,
    pub size_range: Option<(u64, Option<u64>)>,
    pub all_props: bool,
}

impl Default for ListingParams {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            delimiter: None,
            marker: None,
            limit: crate::config::LISTING_DEFAULT_LIMIT,
            before: None,
            exclude_cluster: vec![Cluster::Deleted],
            allowed_paths: None,
            domain: None,
            attr_filters: Vec::new(),
            size_range: None,
            all_props: false,
        }
    }
}

/// One listed leaf: its path plus the version visible as of `before`.
#[derive(Debug, Clone)]
pub struct ListedObject {
    pub path: String,
    pub version: crate::entities::Version,
}

#[derive(Debug, Clone, Default)]
pub struct ListingResult {
    pub objects: Vec<ListedObject>,
    /// Rolled-up prefixes terminated by `delimiter`.
    pub subdirs: Vec<String>,
}

use nimbus_types::{Hash, NodeId, Principal, Serial, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which generation of an object's history a version belongs to.
///
/// Exactly one `Normal` version exists per live node; superseded versions
/// move to `History`; a node's removal is itself recorded as a `Deleted`
/// version rather than an out-of-band flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cluster {
    Normal,
    History,
    Deleted,
}

/// A point in the path hierarchy. Path and id are a bijection for live
/// (non-deleted) nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub path: String,
}

/// One generation of a node's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub serial: Serial,
    pub node: NodeId,
    /// Root hashmap hash. `None` for prefix (container/directory) nodes,
    /// which carry no data of their own.
    pub hash: Option<Hash>,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub source_version: Option<Serial>,
    pub mtime: Timestamp,
    pub modified_by: Principal,
    pub uuid: String,
    pub checksum: String,
    pub cluster: Cluster,
    /// Whether the version's block data is known to be present locally.
    pub available: bool,
    pub map_check_timestamp: Option<Timestamp>,
}

/// `(version_serial, domain, key) -> value`, scoped to one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attributes {
    values: BTreeMap<(String, String), String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: &str, key: &str) -> Option<&str> {
        self.values
            .get(&(domain.to_string(), key.to_string()))
            .map(String::as_str)
    }

    pub fn set(&mut self, domain: &str, key: &str, value: impl Into<String>) {
        self.values
            .insert((domain.to_string(), key.to_string()), value.into());
    }

    pub fn del(&mut self, domain: &str, key: &str) -> bool {
        self.values
            .remove(&(domain.to_string(), key.to_string()))
            .is_some()
    }

    pub fn domain(&self, domain: &str) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .filter(move |((d, _), _)| d == domain)
            .map(|((_, k), v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Carry attributes forward onto a newly created version, matching the
    /// original system's `attribute_copy`.
    pub fn fork(&self) -> Self {
        self.clone()
    }
}

/// Aggregate (count, bytes, mtime) over a node's NORMAL-cluster descendants.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub count: u64,
    pub bytes: u64,
    pub mtime: Timestamp,
}

impl Statistics {
    pub fn apply_delta(&mut self, count_delta: i64, bytes_delta: i64, at: Timestamp) {
        self.count = (self.count as i64 + count_delta).max(0) as u64;
        self.bytes = (self.bytes as i64 + bytes_delta).max(0) as u64;
        if at > self.mtime {
            self.mtime = at;
        }
    }
}

//! Request/response shapes for the façade operations (§4.7, §6). These are
//! the façade's own vocabulary — thin wrappers around the lower layers'
//! entities, not a re-statement of them.

use nimbus_types::{Hash, NodeId, Principal, Serial, Timestamp};
use nimbus_permissions::AccessList;
use serde::{Deserialize, Serialize};

use nimbus_node_tree::Statistics;
use nimbus_policy::Policy;

/// `HEAD /{account}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStats {
    pub count: u64,
    pub bytes: u64,
    pub until: Option<Timestamp>,
    pub policy: Policy,
}

/// One row of `GET /{account}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub name: String,
    pub stats: Statistics,
    pub policy: Policy,
}

/// One row of `GET /{account}/{container}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub name: String,
    pub version_serial: Serial,
    pub size: u64,
    pub hash: Option<Hash>,
    pub content_type: String,
    pub mtime: Timestamp,
    pub uuid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerListing {
    pub containers: Vec<ContainerSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjectListing {
    pub objects: Vec<ObjectSummary>,
    pub subdirs: Vec<String>,
}

/// Filters accepted by `GET /{account}/{container}` (§6).
#[derive(Debug, Clone, Default)]
pub struct ListObjectsQuery {
    pub prefix: String,
    pub delimiter: Option<char>,
    pub marker: Option<String>,
    pub limit: Option<usize>,
    pub until: Option<Timestamp>,
    pub show_only_shared: bool,
    pub meta_domain: Option<String>,
}

/// Outcome of `update_object_hashmap`/`register_object_map`: either the
/// version was created, or the client must upload more blocks first (§4.7
/// step 1, §6 "Missing-block response").
#[derive(Debug, Clone)]
pub enum PutObjectOutcome {
    Created { version_serial: Serial, root_hash: Hash },
    MissingBlocks(Vec<Hash>),
}

/// Everything `update_object_hashmap` needs besides the hashmap bytes
/// themselves.
#[derive(Debug, Clone)]
pub struct PutObjectRequest {
    pub size: u64,
    pub content_type: String,
    pub checksum: String,
    pub domain: String,
    pub meta: Vec<(String, String)>,
    pub replace_meta: bool,
    pub permissions: Option<AccessList>,
}

/// A resolved path with its node id, used internally once a lookup has
/// already happened so callers don't re-resolve it.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub id: NodeId,
    pub path: String,
}

/// The authenticated caller plus the account the operation targets.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: Principal,
    pub account: String,
}

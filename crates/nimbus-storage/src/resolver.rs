//! Bridges the node tree to the permission index's [`NodeKindResolver`]
//! port (§9 "Permission inheritance over heterogeneous node types"). Lives
//! in the façade crate because only the façade depends on both the node
//! tree and the permission index.

use std::sync::Arc;

use nimbus_node_tree::{Cluster, NodeTreeApi};
use nimbus_permissions::NodeKindResolver;
use nimbus_types::{CoreResult, NodeKind, Timestamp};

/// The marker content-type used for a path that is a directory in spirit
/// but carries no data of its own.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/directory";

pub struct TreeNodeKindResolver {
    tree: Arc<dyn NodeTreeApi + Send + Sync>,
}

impl TreeNodeKindResolver {
    pub fn new(tree: Arc<dyn NodeTreeApi + Send + Sync>) -> Self {
        Self { tree }
    }
}

impl NodeKindResolver for TreeNodeKindResolver {
    fn kind_of(&self, path: &str) -> CoreResult<Option<NodeKind>> {
        let depth = path.matches('/').count();
        match depth {
            0 => Ok(Some(NodeKind::Account)),
            1 => Ok(Some(NodeKind::Container)),
            _ => {
                let Some(node) = self.tree.node_lookup(path)? else {
                    return Ok(None);
                };
                let latest = self.tree.version_lookup(node.id, Timestamp::MAX, Cluster::Normal)?;
                let is_directory = latest
                    .as_ref()
                    .is_some_and(|v| v.content_type == DIRECTORY_CONTENT_TYPE);
                Ok(Some(if is_directory { NodeKind::Directory } else { NodeKind::Object }))
            }
        }
    }
}

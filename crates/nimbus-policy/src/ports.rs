use nimbus_types::{CoreResult, NodeId};

use crate::entities::{Policy, PolicyPatch};

pub trait PolicyStoreApi {
    /// The resolved policy for `node`, falling back to deployment defaults
    /// for any key never explicitly set.
    fn policy_get(&self, node: NodeId) -> CoreResult<Policy>;

    /// Apply `patch` to `node`'s policy. `replace` set means every key
    /// absent from `patch` reverts to its deployment default rather than
    /// keeping the previous value; validates each provided key before
    /// writing anything (§4.5).
    fn policy_set(&self, node: NodeId, patch: PolicyPatch, replace: bool) -> CoreResult<Policy>;

    /// The project a container's bytes are currently charged to, or the
    /// account path if the container has no policy row yet.
    fn project_of(&self, node: NodeId, account: &str) -> CoreResult<String>;
}

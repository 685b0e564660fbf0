use nimbus_types::{CoreResult, NodeKind, Principal};
use std::collections::HashSet;

use crate::entities::{Action, AccessList};

/// The permission index needs to know whether an ancestor path is
/// directory-like (§9, "Permission inheritance over heterogeneous node
/// types") without owning the node tree itself. The façade supplies this
/// port at construction time, backed by whatever crate actually tracks node
/// kinds.
pub trait NodeKindResolver: Send + Sync {
    fn kind_of(&self, path: &str) -> CoreResult<Option<NodeKind>>;
}

pub trait PermissionIndexApi {
    fn access_set(&self, path: &str, list: AccessList) -> CoreResult<()>;
    fn access_get(&self, path: &str) -> CoreResult<AccessList>;

    /// `true` if `principal` may perform `action` at `path`, either directly
    /// or via inheritance from a directory-like ancestor, or via public
    /// read, or via group membership.
    fn access_check(&self, path: &str, action: Action, principal: &Principal) -> CoreResult<bool>;

    /// Every path `principal` can reach for `action`, optionally restricted
    /// to those under `prefix`. Used to compute listings a user is allowed
    /// to see.
    fn access_list_paths(&self, principal: &Principal, action: Action, prefix: Option<&str>) -> CoreResult<HashSet<String>>;

    /// The ancestor paths (nearest first) whose permission record would be
    /// consulted when inheriting into `path`.
    fn access_inherit(&self, path: &str) -> CoreResult<Vec<String>>;

    /// Allocate a short random token bound to `path`; never reissues a
    /// retired token.
    fn public_set(&self, path: &str, security_bytes: usize, alphabet: &str) -> CoreResult<String>;
    fn public_unset(&self, path: &str) -> CoreResult<()>;
    fn public_get(&self, path: &str) -> CoreResult<Option<String>>;
    fn public_path(&self, token: &str) -> CoreResult<Option<String>>;

    /// `group_name -> [principal]` for `account`, used to expand
    /// `owner:groupname` references in permission lists.
    fn update_account_groups(&self, account: &Principal, group: &str, members: Vec<Principal>) -> CoreResult<()>;
    fn get_account_groups(&self, account: &Principal) -> CoreResult<std::collections::BTreeMap<String, Vec<Principal>>>;
}

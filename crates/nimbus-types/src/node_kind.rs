//! Node type enum and the directory-like predicate permission inheritance relies on.
//!
//! Design note (§9, "Permission inheritance over heterogeneous node types"):
//! a path inherits an ancestor's permission only when the ancestor's content
//! type identifies it as directory-like. Modeled as an enum with an explicit
//! predicate rather than string comparison on a `content_type` field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The root of an account (`account`).
    Account,
    /// A container under an account (`account/container`).
    Container,
    /// A plain object with byte content (`account/container/name`).
    Object,
    /// A path-delimiter-only prefix node with no content of its own
    /// (synthesized by listing, or an explicit "folder" marker object).
    Directory,
}

impl NodeKind {
    /// Whether permissions set at this node are inherited by descendants.
    ///
    /// Account, Container, and Directory nodes are directory-like; a plain
    /// Object is a leaf and never propagates its permissions downward.
    pub fn is_directory_like(self) -> bool {
        matches!(self, NodeKind::Account | NodeKind::Container | NodeKind::Directory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_like_predicate() {
        assert!(NodeKind::Account.is_directory_like());
        assert!(NodeKind::Container.is_directory_like());
        assert!(NodeKind::Directory.is_directory_like());
        assert!(!NodeKind::Object.is_directory_like());
    }
}

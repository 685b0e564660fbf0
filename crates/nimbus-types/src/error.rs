//! The wire-transparent error taxonomy (§7). One variant per kind, not a type
//! hierarchy — every subsystem converts its narrower internal errors into
//! this enum at its public boundary.

use crate::ids::{NodeId, Serial};
use thiserror::Error;

/// Structured context carried by a `QuotaExceeded` failure, so a caller can
/// render `(limit, usage, requested, resource, holder)` without re-parsing a
/// message string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaContext {
    pub holder: String,
    pub resource: String,
    pub limit: u64,
    pub usage: u64,
    pub requested: i64,
}

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Authorization failure at the permission index.
    #[error("not allowed: {0}")]
    NotAllowed(String),

    /// Path, node, container, account, or version absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Specific version number absent for a node.
    #[error("version {serial} does not exist for node {node}")]
    VersionNotExists { serial: Serial, node: NodeId },

    /// State precondition failed (container not empty, name exists, …).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Local or remote quota check failed.
    #[error(
        "quota exceeded for {}/{}: limit={} usage={} requested={}",
        context.holder, context.resource, context.limit, context.usage, context.requested
    )]
    QuotaExceeded { context: QuotaContext },

    /// Input validation failure (size mismatch, bad policy value, …).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Operation forbidden for the current object state.
    #[error("illegal operation: {0}")]
    IllegalOperation(String),

    /// Hexadecimal hash malformed.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// Unexpected collaborator failure (storage backend, serialization, …).
    #[error("internal error: {0}")]
    InternalError(String),
}

impl CoreError {
    pub fn quota_exceeded(
        holder: impl Into<String>,
        resource: impl Into<String>,
        limit: u64,
        usage: u64,
        requested: i64,
    ) -> Self {
        CoreError::QuotaExceeded {
            context: QuotaContext {
                holder: holder.into(),
                resource: resource.into(),
                limit,
                usage,
                requested,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_exceeded_carries_context() {
        let err = CoreError::quota_exceeded("alice", "diskspace", 1024, 0, 2048);
        match err {
            CoreError::QuotaExceeded { context } => {
                assert_eq!(context.limit, 1024);
                assert_eq!(context.requested, 2048);
            }
            _ => panic!("expected QuotaExceeded"),
        }
    }

    #[test]
    fn display_mentions_kind() {
        let err = CoreError::VersionNotExists { serial: 7, node: 3 };
        assert!(err.to_string().contains('7'));
    }
}

//! # Shared Types
//!
//! Cross-subsystem domain primitives, the wire-transparent error taxonomy, and
//! the `KeyValueStore` port every stateful component is built against.
//!
//! Single source of truth for the identifiers and enums that flow between the
//! block store, node tree, permission index, policy store, quotaholder, and
//! storage façade crates: none of those crates should redefine `Hash`,
//! `NodeId`, `Serial`, `Cluster`, or `CoreError` locally.

pub mod error;
pub mod ids;
pub mod kv;
pub mod node_kind;

pub use error::CoreError;
pub use ids::{hex_decode, hex_encode, Hash, NodeId, Principal, ResourceKey, Serial, Timestamp};
pub use kv::{BatchOperation, InMemoryKVStore, KVStoreError, KeyValueStore, SharedStore};
pub use node_kind::NodeKind;

/// Errors that carry no further context collapse to this.
pub type CoreResult<T> = Result<T, CoreError>;

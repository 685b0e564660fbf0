//! # Node Tree
//!
//! The hierarchical path → node graph (§4.3): nodes, their version history,
//! per-version attributes, and per-node aggregate statistics. Every other
//! storage component addresses state through a path or a `NodeId` minted
//! here.

pub mod config;
pub mod entities;
pub mod listing;
pub mod locks;
pub mod ports;
pub mod service;

pub use config::NodeTreeConfig;
pub use entities::{Attributes, Cluster, Node, Statistics, Version};
pub use listing::{AttributeFilter, ListedObject, ListingParams, ListingResult};
pub use ports::NodeTreeApi;
pub use service::NodeTreeService;

/// Guard returned by `node_lookup_for_update`; holding it occupies the
/// path's stripe lock for the caller's "rest of the transaction" (§4.3).
pub type NodeLockGuard<'a> = parking_lot::MutexGuard<'a, ()>;

//! # Block Store and Hashmap
//!
//! Content-addressed storage for fixed-size byte blocks (§4.1), plus the
//! Merkle-style hashmap (§4.2) that gives an ordered sequence of blocks a
//! single root hash — the content address objects are identified by
//! everywhere else in the system.
//!
//! Blocks and hashmaps share one `KeyValueStore` keyspace, partitioned by
//! key prefix (`block:` / `map:`), the same convention the rest of this
//! workspace uses for the other ports-backed stores.

pub mod config;
pub mod hashmap;
pub mod ports;
pub mod service;

pub use config::BlockStoreConfig;
pub use hashmap::Hashmap;
pub use ports::BlockStoreApi;
pub use service::BlockStoreService;

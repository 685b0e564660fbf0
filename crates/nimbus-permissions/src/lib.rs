//! # Permission Index
//!
//! Per-path read/write access control lists with ancestor inheritance
//! (§4.4), the public-URL token table, and the account group table that
//! `owner:groupname` references expand through.
//!
//! Inheritance needs to know whether an ancestor path is directory-like;
//! rather than depend on the node tree crate directly, this crate asks an
//! injected [`NodeKindResolver`] — the façade wires it to whatever actually
//! tracks node kinds, keeping this crate a leaf dependency.

pub mod cache;
pub mod entities;
pub mod ports;
pub mod service;

pub use cache::PermissionCache;
pub use entities::{Action, AccessList, PublicBinding};
pub use ports::{NodeKindResolver, PermissionIndexApi};
pub use service::PermissionIndexService;

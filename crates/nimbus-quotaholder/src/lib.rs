//! # Quotaholder
//!
//! The transactional resource-accounting service (§4.6): holdings keyed by
//! `(holder, source, resource)`, the two-phase issue/resolve commission
//! protocol, and the immutable provision log every resolution appends to.
//!
//! `issue_commission` and `resolve_pending_commissions` each hold a single
//! process-wide lock for their check-then-write sequence — the in-process
//! stand-in for "transactional" in a crate with no literal database (§5,
//! §10 "Persistence").

pub mod entities;
pub mod ports;
pub mod service;

pub use entities::{Commission, CommissionDescription, Holding, Provision, ProvisionLogEntry, Resolution, ResolveOutcome};
pub use ports::{QuotaholderApi, QuotaholderInternals};
pub use service::QuotaholderService;

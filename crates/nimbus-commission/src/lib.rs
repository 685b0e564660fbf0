//! # Commission Coordinator
//!
//! The glue enforcing correct ordering between local storage mutations and
//! remote Quotaholder state (§4.8): issue a commission and durably record
//! its serial before any local commit completes, accept or reject it
//! afterward, and let a periodic reconciler clean up whatever a crash left
//! between those steps.

pub mod entities;
pub mod ports;
pub mod resource;
pub mod service;

pub use entities::{CommissionSerialRecord, ReconcileReport};
pub use ports::CommissionCoordinatorApi;
pub use resource::{MutationAction, ResourceKind};
pub use service::CommissionCoordinator;

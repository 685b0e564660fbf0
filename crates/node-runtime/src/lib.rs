//! # Nimbus Node Runtime
//!
//! The binary that wires the `nimbus-*` domain crates into a running HTTP
//! service: [`config`] loads and validates deployment settings, [`wiring`]
//! assembles the collaborator graph behind a shared `KeyValueStore`,
//! [`handlers`] exposes the storage façade over `axum`, and [`reconciler`]
//! drives the periodic commission sweep described in the core spec's §4.8.

pub mod config;
pub mod container;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod reconciler;
pub mod wiring;

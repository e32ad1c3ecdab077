//! Workspace placeholder crate.
//!
//! This crate exists to expose a feature flag that maps to the workspace's
//! service crate. Host applications can depend on `finsync-workspace` with the
//! `service` feature (on by default) and reach the engine through
//! `finsync_workspace::service`.

#[cfg(feature = "service")]
pub use core_service as service;

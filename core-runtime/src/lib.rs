//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the item sync engine:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate establishes the logging conventions and the fail-fast
//! configuration builder that the service layer uses to wire the ledger and
//! the sync engine together.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{DatabaseLocation, EngineConfig, EngineConfigBuilder};
pub use error::{Error, Result};

//! # Engine Configuration Module
//!
//! Provides configuration management for the item sync engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` instance that holds every collaborator the engine needs.
//! It enforces fail-fast validation so a host learns about a missing bridge at
//! startup instead of on the first sync.
//!
//! ## Required Dependencies
//!
//! - `AggregationProvider` - Talks to the third-party aggregation provider
//! - `JobScheduler` - Queues item sync and destroy jobs
//! - `CredentialCipher` - Seals access tokens before they are stored
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `Clock` - Time source (default: `SystemClock`)
//! - `AccountDataSync` - Downstream per-account hook (default: no-op)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .database_path("/var/lib/finsync/ledger.db")
//!     .provider(Arc::new(MyProvider))
//!     .scheduler(Arc::new(MyScheduler))
//!     .cipher(Arc::new(MyCipher))
//!     .strict_revocation(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    AccountDataSync, AggregationProvider, Clock, CredentialCipher, JobScheduler, NoopAccountSync,
    SystemClock,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Default pool size for file-backed databases.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const MAX_CONNECTIONS_LIMIT: u32 = 64;

/// Where the ledger database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// SQLite file, created if missing
    File(PathBuf),
    /// Private in-memory database (tests, ephemeral hosts)
    InMemory,
}

/// Engine configuration.
///
/// Use [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    pub database: DatabaseLocation,

    /// Upper bound on pooled connections; ignored for in-memory databases
    pub max_connections: u32,

    pub provider: Arc<dyn AggregationProvider>,

    pub scheduler: Arc<dyn JobScheduler>,

    pub cipher: Arc<dyn CredentialCipher>,

    pub clock: Arc<dyn Clock>,

    pub account_sync: Arc<dyn AccountDataSync>,

    /// Surface credential revocation failures instead of deleting locally
    pub strict_revocation: bool,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .field("provider", &"AggregationProvider { ... }")
            .field("scheduler", &"JobScheduler { ... }")
            .field("cipher", &"CredentialCipher { ... }")
            .field("clock", &"Clock { ... }")
            .field("account_sync", &"AccountDataSync { ... }")
            .field("strict_revocation", &self.strict_revocation)
            .finish()
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Pool size is within bounds
    pub fn validate(&self) -> Result<()> {
        if let DatabaseLocation::File(path) = &self.database {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        if self.max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(Error::Config(format!(
                "max_connections exceeds maximum of {}",
                MAX_CONNECTIONS_LIMIT
            )));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    database: Option<DatabaseLocation>,
    max_connections: Option<u32>,
    provider: Option<Arc<dyn AggregationProvider>>,
    scheduler: Option<Arc<dyn JobScheduler>>,
    cipher: Option<Arc<dyn CredentialCipher>>,
    clock: Option<Arc<dyn Clock>>,
    account_sync: Option<Arc<dyn AccountDataSync>>,
    strict_revocation: bool,
}

impl EngineConfigBuilder {
    /// Sets the SQLite database file path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(DatabaseLocation::File(path.into()));
        self
    }

    /// Uses a private in-memory database instead of a file.
    pub fn in_memory(mut self) -> Self {
        self.database = Some(DatabaseLocation::InMemory);
        self
    }

    /// Sets the maximum pool size.
    ///
    /// Default: [`DEFAULT_MAX_CONNECTIONS`]
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the aggregation provider client (required).
    pub fn provider(mut self, provider: Arc<dyn AggregationProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the background job scheduler (required).
    pub fn scheduler(mut self, scheduler: Arc<dyn JobScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets the credential cipher (required).
    ///
    /// Access tokens are sealed with it before they reach the database.
    pub fn cipher(mut self, cipher: Arc<dyn CredentialCipher>) -> Self {
        self.cipher = Some(cipher);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the downstream hook invoked for every reconciled account.
    pub fn account_sync(mut self, account_sync: Arc<dyn AccountDataSync>) -> Self {
        self.account_sync = Some(account_sync);
        self
    }

    /// When enabled, a failed credential revocation aborts item removal.
    ///
    /// Default: `false` (the local item is deleted anyway)
    pub fn strict_revocation(mut self, strict: bool) -> Self {
        self.strict_revocation = strict;
        self
    }

    /// Builds the final `EngineConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when no database location was set or a value is out of range
    /// - `Error::CapabilityMissing` when a required bridge was not provided
    pub fn build(self) -> Result<EngineConfig> {
        let database = self.database.ok_or_else(|| {
            Error::Config(
                "Database location is required. Use .database_path() or .in_memory() to set it."
                    .to_string(),
            )
        })?;

        let provider = self.provider.ok_or_else(|| {
            capability_missing(
                "AggregationProvider",
                "An aggregation provider client is required to fetch item data. \
                 Inject one with .provider().",
            )
        })?;

        let scheduler = self.scheduler.ok_or_else(|| {
            capability_missing(
                "JobScheduler",
                "A job scheduler is required to queue item sync and destroy jobs. \
                 Inject one with .scheduler().",
            )
        })?;

        let cipher = self.cipher.ok_or_else(|| {
            capability_missing(
                "CredentialCipher",
                "A credential cipher is required so access tokens are never stored in \
                 plaintext. Inject one with .cipher().",
            )
        })?;

        let config = EngineConfig {
            database,
            max_connections: self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS),
            provider,
            scheduler,
            cipher,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            account_sync: self
                .account_sync
                .unwrap_or_else(|| Arc::new(NoopAccountSync)),
            strict_revocation: self.strict_revocation,
        };

        config.validate()?;

        Ok(config)
    }
}

//! # Host Bridge Traits
//!
//! Contracts for everything the item sync core needs but does not own.
//!
//! ## Overview
//!
//! The sync core talks to a third-party aggregation provider, persists sealed
//! credentials, defers work to a job queue and hands reconciled accounts to a
//! downstream pipeline. Each of those collaborators is a trait in this crate so
//! hosts can plug in their own implementations and tests can script them.
//!
//! ## Traits
//!
//! - [`AggregationProvider`](provider::AggregationProvider) - Item, account, transaction,
//!   investment and liability data from the provider
//! - [`JobScheduler`](background::JobScheduler) - Fire-and-forget background jobs
//! - [`CredentialCipher`](storage::CredentialCipher) - Sealing of stored access credentials
//! - [`AccountDataSync`](account_sync::AccountDataSync) - Downstream per-account sync hook
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Provider
//! implementations must report failures returned by the provider API as
//! [`BridgeError::ProviderApi`]; the sync core recovers from those for
//! individual data categories and treats every other variant as fatal.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across worker tasks.

pub mod account_sync;
pub mod background;
pub mod error;
pub mod provider;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use account_sync::{AccountDataSync, LinkedAccount, NoopAccountSync};
pub use background::{BackgroundJob, JobId, JobScheduler};
pub use provider::{
    AccessToken, AccountScoped, AggregationProvider, InvestmentsSnapshot, ItemHandle,
    LiabilitiesSnapshot, ProviderAccount, ProviderItem, TokenExchange, TransactionsDelta,
};
pub use storage::{CredentialCipher, PassthroughCipher};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};

//! # Item Sync Module
//!
//! Keeps the local ledger in step with the aggregation provider.
//!
//! ## Overview
//!
//! This module manages:
//! - Linking items from a public token and tearing them down again
//! - Full item syncs: product refresh, account reconciliation and the
//!   per-category data (transactions, investments, liabilities)
//! - Atomic write scopes so a failed category leaves no partial records
//! - A per-item lock that rejects overlapping syncs
//! - Dispatching deferred work from a job queue
//!
//! ## Components
//!
//! - **Lifecycle** (`lifecycle`): Create, schedule deletion and remove items
//! - **Orchestrator** (`orchestrator`): Runs one item sync end to end
//! - **Reconciler** (`reconciler`): Maps provider accounts onto ledger accounts
//! - **Strategies** (`strategy`, `categories`): Eligibility, fetch and apply per data category
//! - **Scope** (`scope`): Commit-or-rollback transaction wrapper
//! - **Jobs** (`jobs`): Background job dispatch and an in-process queue

pub mod categories;
pub mod error;
pub mod jobs;
pub mod lifecycle;
pub mod lock;
pub mod orchestrator;
pub mod reconciler;
pub mod scope;
pub mod strategy;
pub mod syncable;

#[cfg(test)]
pub(crate) mod test_support;

pub use categories::CategoryStats;
pub use error::{Result, SyncError};
pub use jobs::{in_process_queue, InProcessScheduler, JobDispatcher, JobOutcome, JobQueue};
pub use lifecycle::ItemLifecycle;
pub use lock::{SyncGuard, SyncLockRegistry};
pub use orchestrator::{ItemSyncReport, ItemSyncer};
pub use reconciler::AccountReconciler;
pub use scope::AtomicScope;
pub use strategy::{CategoryOutcome, CategoryPayload, CategoryStatus, SyncCategory};
pub use syncable::Syncable;

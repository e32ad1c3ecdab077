//! Background Job Scheduling
//!
//! The core never runs long work inline with a user request. Item syncs and
//! item removals are handed to a [`JobScheduler`] and executed later by a
//! worker, which dispatches each [`BackgroundJob`] back into the core.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::Result;

/// Scheduled job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Work the core can defer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackgroundJob {
    /// Run a full item sync.
    SyncItem {
        item_id: String,
        start_date: Option<NaiveDate>,
    },
    /// Revoke the item's credential and delete it locally.
    DestroyItem { item_id: String },
    /// Run the downstream data sync of a single account.
    SyncAccount {
        account_id: String,
        start_date: Option<NaiveDate>,
    },
}

impl BackgroundJob {
    /// Stable name used in logs and by host queues.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncItem { .. } => "sync_item",
            Self::DestroyItem { .. } => "destroy_item",
            Self::SyncAccount { .. } => "sync_account",
        }
    }

    /// Id of the item or account the job operates on.
    pub fn subject_id(&self) -> &str {
        match self {
            Self::SyncItem { item_id, .. } | Self::DestroyItem { item_id } => item_id,
            Self::SyncAccount { account_id, .. } => account_id,
        }
    }
}

/// Fire-and-forget job queue.
///
/// `enqueue` must return as soon as the job is accepted; it must not wait for
/// the job to run.
#[async_trait]
pub trait JobScheduler: Send + Sync {
    async fn enqueue(&self, job: BackgroundJob) -> Result<JobId>;

    /// Check if the queue currently accepts work.
    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_accessors() {
        let job = BackgroundJob::SyncItem {
            item_id: "item-1".to_string(),
            start_date: None,
        };
        assert_eq!(job.name(), "sync_item");
        assert_eq!(job.subject_id(), "item-1");

        let job = BackgroundJob::DestroyItem {
            item_id: "item-2".to_string(),
        };
        assert_eq!(job.name(), "destroy_item");
        assert_eq!(job.subject_id(), "item-2");

        let job = BackgroundJob::SyncAccount {
            account_id: "acct-1".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        assert_eq!(job.name(), "sync_account");
        assert_eq!(job.subject_id(), "acct-1");
    }

    #[test]
    fn test_job_serializes_with_kind_tag() {
        let job = BackgroundJob::DestroyItem {
            item_id: "item-2".to_string(),
        };
        let json = serde_json::to_string(&job).unwrap();
        assert_eq!(json, r#"{"kind":"destroy_item","item_id":"item-2"}"#);
    }

    #[test]
    fn test_job_id() {
        assert_eq!(JobId::new("a"), JobId::new("a"));
        assert_ne!(JobId::generate(), JobId::generate());
    }
}

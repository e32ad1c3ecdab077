//! Deferred sync capability shared by items and accounts

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use bridge_traits::background::{BackgroundJob, JobId, JobScheduler};
use chrono::NaiveDate;
use core_ledger::{Account, Item};
use tracing::debug;

/// Something that can be synced later through the job queue.
#[async_trait]
pub trait Syncable: Send + Sync {
    /// Id logged with the queued job.
    fn sync_key(&self) -> String;

    /// Job that syncs this record.
    fn sync_job(&self, start_date: Option<NaiveDate>) -> BackgroundJob;

    /// Queue a sync and return without waiting for it.
    async fn sync_later(
        &self,
        scheduler: &dyn JobScheduler,
        start_date: Option<NaiveDate>,
    ) -> Result<JobId> {
        let job = self.sync_job(start_date);
        let name = job.name();
        let job_id = scheduler.enqueue(job).await.map_err(SyncError::Scheduler)?;
        debug!(key = %self.sync_key(), job = name, job_id = %job_id, "Sync queued");
        Ok(job_id)
    }
}

impl Syncable for Item {
    fn sync_key(&self) -> String {
        self.id.as_str()
    }

    fn sync_job(&self, start_date: Option<NaiveDate>) -> BackgroundJob {
        BackgroundJob::SyncItem {
            item_id: self.id.as_str(),
            start_date,
        }
    }
}

impl Syncable for Account {
    fn sync_key(&self) -> String {
        self.id.as_str()
    }

    fn sync_job(&self, start_date: Option<NaiveDate>) -> BackgroundJob {
        BackgroundJob::SyncAccount {
            account_id: self.id.as_str(),
            start_date,
        }
    }
}

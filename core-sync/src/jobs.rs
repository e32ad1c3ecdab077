//! # Background Jobs
//!
//! Executes deferred work handed to a [`JobScheduler`].
//!
//! [`JobDispatcher`] maps each [`BackgroundJob`] back onto the core:
//! item syncs go to the [`ItemSyncer`], item destruction to the
//! [`ItemLifecycle`] and single-account syncs to the downstream
//! [`AccountDataSync`] hook.
//!
//! [`in_process_queue`] provides a scheduler backed by a tokio channel for
//! hosts without their own queue. The worker runs every job on its own
//! task; overlapping syncs of one item are rejected by the item lock.

use crate::error::{Result, SyncError};
use crate::lifecycle::ItemLifecycle;
use crate::orchestrator::{ItemSyncReport, ItemSyncer};
use async_trait::async_trait;
use bridge_traits::account_sync::AccountDataSync;
use bridge_traits::background::{BackgroundJob, JobId, JobScheduler};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use core_ledger::{AccountId, AccountRepository, ItemId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// What a dispatched job did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    ItemSynced(ItemSyncReport),
    ItemDestroyed,
    AccountSynced,
}

/// Routes background jobs to the component that owns them.
pub struct JobDispatcher {
    syncer: Arc<ItemSyncer>,
    lifecycle: Arc<ItemLifecycle>,
    accounts: Arc<dyn AccountRepository>,
    account_sync: Arc<dyn AccountDataSync>,
}

impl JobDispatcher {
    pub fn new(
        syncer: Arc<ItemSyncer>,
        lifecycle: Arc<ItemLifecycle>,
        accounts: Arc<dyn AccountRepository>,
        account_sync: Arc<dyn AccountDataSync>,
    ) -> Self {
        Self {
            syncer,
            lifecycle,
            accounts,
            account_sync,
        }
    }

    /// Run `job` to completion.
    ///
    /// # Errors
    ///
    /// `Validation` if the job carries a malformed id, otherwise whatever the
    /// target operation returns.
    #[instrument(skip(self, job), fields(job = job.name(), subject = job.subject_id()))]
    pub async fn dispatch(&self, job: BackgroundJob) -> Result<JobOutcome> {
        match job {
            BackgroundJob::SyncItem {
                item_id,
                start_date,
            } => {
                let item_id = ItemId::from_string(&item_id).map_err(SyncError::from_ledger_input)?;
                let report = self.syncer.sync(item_id, start_date).await?;
                Ok(JobOutcome::ItemSynced(report))
            }
            BackgroundJob::DestroyItem { item_id } => {
                let item_id = ItemId::from_string(&item_id).map_err(SyncError::from_ledger_input)?;
                self.lifecycle.remove(item_id).await?;
                Ok(JobOutcome::ItemDestroyed)
            }
            BackgroundJob::SyncAccount {
                account_id,
                start_date,
            } => {
                let id =
                    AccountId::from_string(&account_id).map_err(SyncError::from_ledger_input)?;
                let account = self
                    .accounts
                    .find_by_id(&id)
                    .await?
                    .ok_or(SyncError::AccountNotFound {
                        account_id: account_id.clone(),
                    })?;

                self.account_sync
                    .sync_account(&account.linked(), start_date)
                    .await
                    .map_err(|source| SyncError::AccountSync { account_id, source })?;
                Ok(JobOutcome::AccountSynced)
            }
        }
    }
}

type QueuedJob = (JobId, BackgroundJob);

/// Create a connected in-process scheduler and its job queue.
pub fn in_process_queue() -> (InProcessScheduler, JobQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InProcessScheduler { tx }, JobQueue { rx })
}

/// [`JobScheduler`] that hands jobs to a [`JobQueue`] in the same process.
#[derive(Clone)]
pub struct InProcessScheduler {
    tx: mpsc::UnboundedSender<QueuedJob>,
}

#[async_trait]
impl JobScheduler for InProcessScheduler {
    async fn enqueue(&self, job: BackgroundJob) -> BridgeResult<JobId> {
        let id = JobId::generate();
        debug!(job_id = %id, job = job.name(), subject = job.subject_id(), "Job enqueued");
        self.tx
            .send((id.clone(), job))
            .map_err(|_| BridgeError::NotAvailable("job queue closed".to_string()))?;
        Ok(id)
    }

    async fn is_available(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Receiving end of an in-process scheduler.
pub struct JobQueue {
    rx: mpsc::UnboundedReceiver<QueuedJob>,
}

impl JobQueue {
    /// Wait for the next job. `None` once every scheduler handle is dropped.
    pub async fn next(&mut self) -> Option<QueuedJob> {
        self.rx.recv().await
    }

    /// Dispatch every job queued so far, including jobs queued while
    /// draining, and return their results in execution order.
    pub async fn run_pending(
        &mut self,
        dispatcher: &JobDispatcher,
    ) -> Vec<(JobId, Result<JobOutcome>)> {
        let mut results = Vec::new();
        while let Ok((id, job)) = self.rx.try_recv() {
            let outcome = run_job(dispatcher, &id, job).await;
            results.push((id, outcome));
        }
        results
    }

    /// Receive jobs on a background task until the queue closes, running
    /// each one on its own task.
    pub fn spawn_worker(mut self, dispatcher: Arc<JobDispatcher>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some((id, job)) = self.next().await {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    let _ = run_job(&dispatcher, &id, job).await;
                });
            }
            info!("Job queue closed, worker exiting");
        })
    }
}

async fn run_job(dispatcher: &JobDispatcher, id: &JobId, job: BackgroundJob) -> Result<JobOutcome> {
    let name = job.name();
    let outcome = dispatcher.dispatch(job).await;
    match &outcome {
        Ok(_) => info!(job_id = %id, job = name, "Job completed"),
        Err(e) => error!(job_id = %id, job = name, error = %e, "Job failed"),
    }
    outcome
}

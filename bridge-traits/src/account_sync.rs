//! Downstream account sync hook
//!
//! After an item sync has reconciled provider data, every linked account is
//! handed to the host's own account pipeline (balance history, categorisation,
//! net worth). That pipeline is outside the core.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;

/// Identifies a reconciled account for the downstream pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAccount {
    pub account_id: String,
    pub item_id: String,
    pub family_id: String,
    pub provider_account_id: String,
}

#[async_trait]
pub trait AccountDataSync: Send + Sync {
    async fn sync_account(&self, account: &LinkedAccount, start_date: Option<NaiveDate>) -> Result<()>;
}

/// Hook that does nothing. Used when the host has no downstream pipeline.
#[derive(Debug, Clone, Default)]
pub struct NoopAccountSync;

#[async_trait]
impl AccountDataSync for NoopAccountSync {
    async fn sync_account(&self, _account: &LinkedAccount, _start_date: Option<NaiveDate>) -> Result<()> {
        Ok(())
    }
}

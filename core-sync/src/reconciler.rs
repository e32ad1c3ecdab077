//! Account reconciliation
//!
//! Maps provider accounts onto local accounts. An account belongs to exactly
//! one item and is identified by its provider account id within that item;
//! the family is recorded on the account. Snapshot fields are overwritten on
//! every sync.

use crate::error::Result;
use core_ledger::{Account, AccountRepository, Item};
use bridge_traits::provider::ProviderAccount;
use bridge_traits::time::Clock;
use std::sync::Arc;
use tracing::debug;

pub struct AccountReconciler {
    accounts: Arc<dyn AccountRepository>,
    clock: Arc<dyn Clock>,
}

impl AccountReconciler {
    pub fn new(accounts: Arc<dyn AccountRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { accounts, clock }
    }

    /// Existing account of `item` with this provider account id, or a new
    /// one.
    pub async fn find_or_create(&self, item: &Item, data: &ProviderAccount) -> Result<Account> {
        let mut candidate = Account::from_provider(item, data);
        candidate.created_at = self.clock.unix_timestamp();
        candidate.updated_at = candidate.created_at;
        let (account, created) = self.accounts.find_or_create(&candidate).await?;
        if created {
            debug!(
                item_id = %item.id,
                provider_account_id = %data.account_id,
                "Account created"
            );
        }
        Ok(account)
    }

    /// Overwrite the account snapshot with provider data. Last write wins.
    pub async fn sync_account_data(
        &self,
        mut account: Account,
        data: &ProviderAccount,
    ) -> Result<Account> {
        account.apply_snapshot(data, self.clock.unix_timestamp());
        self.accounts.update_snapshot(&account).await?;
        Ok(account)
    }

    /// `find_or_create` followed by `sync_account_data`.
    pub async fn reconcile(&self, item: &Item, data: &ProviderAccount) -> Result<Account> {
        let account = self.find_or_create(item, data).await?;
        self.sync_account_data(account, data).await
    }
}

//! # Item Sync Orchestrator
//!
//! Runs a complete sync of one item against the aggregation provider.
//!
//! ## Workflow
//!
//! 1. Claim the item's sync lock
//! 2. Stamp `last_synced_at` before any provider call
//! 3. Refresh the item's product capabilities
//! 4. Reconcile every provider account
//! 5. For each eligible category: fetch, then apply inside one atomic scope
//! 6. Hand every reconciled account to the downstream account sync
//!
//! Failures in steps 3 and 4 abort the sync. A category fetch refused by the
//! provider API is logged and treated as "no data"; the other categories
//! still run. A write failure rolls back that category's scope only and
//! aborts the sync; scopes committed earlier stay committed.

use crate::error::{Result, SyncError};
use crate::lock::SyncLockRegistry;
use crate::reconciler::AccountReconciler;
use crate::scope::AtomicScope;
use crate::strategy::{CategoryOutcome, CategoryPayload, CategoryStatus, SyncCategory};
use bridge_traits::account_sync::AccountDataSync;
use bridge_traits::error::BridgeError;
use bridge_traits::provider::AggregationProvider;
use bridge_traits::time::Clock;
use chrono::NaiveDate;
use core_ledger::{Account, AccountRepository, Item, ItemId, ItemRepository, ProductSet};
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Summary of one item sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSyncReport {
    pub item_id: ItemId,
    pub accounts_reconciled: usize,
    pub categories: Vec<CategoryOutcome>,
}

impl ItemSyncReport {
    pub fn status(&self, category: SyncCategory) -> Option<&CategoryStatus> {
        self.categories
            .iter()
            .find(|outcome| outcome.category == category)
            .map(|outcome| &outcome.status)
    }
}

pub struct ItemSyncer {
    pool: SqlitePool,
    items: Arc<dyn ItemRepository>,
    reconciler: AccountReconciler,
    provider: Arc<dyn AggregationProvider>,
    account_sync: Arc<dyn AccountDataSync>,
    clock: Arc<dyn Clock>,
    locks: SyncLockRegistry,
}

impl ItemSyncer {
    pub fn new(
        pool: SqlitePool,
        items: Arc<dyn ItemRepository>,
        accounts: Arc<dyn AccountRepository>,
        provider: Arc<dyn AggregationProvider>,
        account_sync: Arc<dyn AccountDataSync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool,
            items,
            reconciler: AccountReconciler::new(accounts, Arc::clone(&clock)),
            provider,
            account_sync,
            clock,
            locks: SyncLockRegistry::new(),
        }
    }

    pub fn locks(&self) -> &SyncLockRegistry {
        &self.locks
    }

    /// Sync one item end to end.
    ///
    /// # Errors
    ///
    /// - `SyncInProgress` if another sync of the item is running
    /// - `ItemNotFound` if the item does not exist
    /// - `Provider` if item metadata or the account list cannot be fetched,
    ///   or a category fetch fails outside the provider API
    /// - `Ledger` if any write fails
    /// - `AccountSync` if the downstream account sync fails
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn sync(&self, item_id: ItemId, start_date: Option<NaiveDate>) -> Result<ItemSyncReport> {
        let _guard = self
            .locks
            .try_acquire(item_id)
            .ok_or_else(|| SyncError::SyncInProgress {
                item_id: item_id.to_string(),
            })?;

        let mut item = self
            .items
            .find_by_id(&item_id)
            .await?
            .ok_or_else(|| SyncError::ItemNotFound {
                item_id: item_id.to_string(),
            })?;

        let started_at = self.clock.now();
        self.items.touch_last_synced(&item.id, started_at).await?;
        item.last_synced_at = Some(started_at);

        self.refresh_products(&mut item).await?;
        let accounts = self.reconcile_accounts(&item).await?;

        let mut categories = Vec::with_capacity(SyncCategory::ALL.len());
        for category in SyncCategory::ALL {
            let status = self.sync_category(category, &item, &accounts).await?;
            categories.push(CategoryOutcome { category, status });
        }

        for account in &accounts {
            self.account_sync
                .sync_account(&account.linked(), start_date)
                .await
                .map_err(|source| SyncError::AccountSync {
                    account_id: account.id.to_string(),
                    source,
                })?;
        }

        info!(accounts = accounts.len(), "Item sync finished");

        Ok(ItemSyncReport {
            item_id: item.id,
            accounts_reconciled: accounts.len(),
            categories,
        })
    }

    async fn refresh_products(&self, item: &mut Item) -> Result<()> {
        let metadata = self
            .provider
            .get_item(&item.access_token)
            .await
            .map_err(|e| SyncError::provider("get_item", e))?;

        item.available_products = ProductSet::new(metadata.available_products);
        item.billed_products = ProductSet::new(metadata.billed_products);
        self.items
            .update_products(
                &item.id,
                &item.available_products,
                &item.billed_products,
                self.clock.now(),
            )
            .await?;
        Ok(())
    }

    async fn reconcile_accounts(&self, item: &Item) -> Result<Vec<Account>> {
        let remote = self
            .provider
            .get_item_accounts(&item.handle())
            .await
            .map_err(|e| SyncError::provider("get_item_accounts", e))?;

        let mut accounts = Vec::with_capacity(remote.len());
        for data in &remote {
            accounts.push(self.reconciler.reconcile(item, data).await?);
        }
        debug!(count = accounts.len(), "Accounts reconciled");
        Ok(accounts)
    }

    async fn sync_category(
        &self,
        category: SyncCategory,
        item: &Item,
        accounts: &[Account],
    ) -> Result<CategoryStatus> {
        if !category.is_eligible(item) {
            debug!(%category, "Category skipped");
            return Ok(CategoryStatus::Skipped);
        }

        let Some(payload) = self.safe_fetch(category, item).await? else {
            return Ok(CategoryStatus::Unavailable);
        };

        let mut scope = AtomicScope::begin(&self.pool, category.method_name()).await?;
        let outcome = payload
            .apply(scope.conn(), item, accounts, self.clock.unix_timestamp())
            .await;
        let stats = scope.finish(outcome).await?;

        debug!(
            %category,
            upserted = stats.upserted,
            removed = stats.removed,
            skipped = stats.skipped,
            "Category applied"
        );
        Ok(CategoryStatus::Applied(stats))
    }

    /// Fetch a category, mapping provider API errors to `None`.
    async fn safe_fetch(&self, category: SyncCategory, item: &Item) -> Result<Option<CategoryPayload>> {
        match category.fetch(self.provider.as_ref(), &item.handle()).await {
            Ok(payload) => Ok(Some(payload)),
            Err(error @ BridgeError::ProviderApi { .. }) => {
                warn!(
                    item_id = %item.id,
                    method = category.method_name(),
                    error = %error,
                    "Provider refused category fetch"
                );
                Ok(None)
            }
            Err(error) => Err(SyncError::provider(category.method_name(), error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{provider_account, seed_item, MockProvider};
    use bridge_traits::account_sync::NoopAccountSync;
    use bridge_traits::provider::{LiabilitiesSnapshot, ProviderItem};
    use bridge_traits::storage::PassthroughCipher;
    use bridge_traits::time::SystemClock;
    use core_ledger::{SqliteAccountRepository, SqliteItemRepository};

    fn syncer(pool: SqlitePool, provider: MockProvider) -> ItemSyncer {
        ItemSyncer::new(
            pool.clone(),
            Arc::new(SqliteItemRepository::new(pool.clone(), Arc::new(PassthroughCipher))),
            Arc::new(SqliteAccountRepository::new(pool)),
            Arc::new(provider),
            Arc::new(NoopAccountSync),
            Arc::new(SystemClock),
        )
    }

    fn provider_item(available: &[&str]) -> ProviderItem {
        ProviderItem {
            item_id: "item-fixture".to_string(),
            available_products: available.iter().map(|p| p.to_string()).collect(),
            billed_products: vec![],
        }
    }

    #[tokio::test]
    async fn test_locked_item_is_rejected() {
        let (pool, item) = seed_item().await;
        let syncer = syncer(pool, MockProvider::new());

        let _held = syncer.locks().try_acquire(item.id).unwrap();
        let err = syncer.sync(item.id, None).await.unwrap_err();
        assert!(matches!(err, SyncError::SyncInProgress { .. }));
    }

    #[tokio::test]
    async fn test_unknown_item() {
        let (pool, _item) = seed_item().await;
        let syncer = syncer(pool, MockProvider::new());

        let err = syncer.sync(ItemId::new(), None).await.unwrap_err();
        assert!(matches!(err, SyncError::ItemNotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_item_failure_is_fatal() {
        let (pool, item) = seed_item().await;
        let mut provider = MockProvider::new();
        provider
            .expect_get_item()
            .returning(|_| Err(BridgeError::provider_api("ITEM_LOGIN_REQUIRED", "login")));
        provider.expect_get_item_accounts().never();

        let syncer = syncer(pool, provider);
        let err = syncer.sync(item.id, None).await.unwrap_err();
        assert!(matches!(err, SyncError::Provider { method: "get_item", .. }));
        assert!(!syncer.locks().is_locked(&item.id));
    }

    #[tokio::test]
    async fn test_transport_error_in_category_fetch_propagates() {
        let (pool, item) = seed_item().await;
        let mut provider = MockProvider::new();
        provider
            .expect_get_item()
            .returning(|_| Ok(provider_item(&["transactions"])));
        provider
            .expect_get_item_accounts()
            .returning(|_| Ok(vec![provider_account("A1")]));
        provider
            .expect_get_item_transactions()
            .returning(|_| Err(BridgeError::Transport("connection reset".to_string())));

        let err = syncer(pool, provider).sync(item.id, None).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Provider { method: "get_item_transactions", .. }
        ));
    }

    #[tokio::test]
    async fn test_provider_api_error_marks_category_unavailable() {
        let (pool, item) = seed_item().await;
        let mut provider = MockProvider::new();
        provider
            .expect_get_item()
            .returning(|_| Ok(provider_item(&["transactions", "liabilities"])));
        provider
            .expect_get_item_accounts()
            .returning(|_| Ok(vec![provider_account("A1")]));
        provider
            .expect_get_item_transactions()
            .returning(|_| Err(BridgeError::provider_api("PRODUCT_NOT_READY", "not ready")));
        provider
            .expect_get_item_liabilities()
            .times(1)
            .returning(|_| Ok(LiabilitiesSnapshot::default()));
        provider.expect_get_item_investments().never();

        let report = syncer(pool, provider).sync(item.id, None).await.unwrap();
        assert_eq!(report.accounts_reconciled, 1);
        assert_eq!(
            report.status(SyncCategory::Transactions),
            Some(&CategoryStatus::Unavailable)
        );
        assert_eq!(
            report.status(SyncCategory::Investments),
            Some(&CategoryStatus::Skipped)
        );
        assert!(matches!(
            report.status(SyncCategory::Liabilities),
            Some(CategoryStatus::Applied(_))
        ));
    }
}

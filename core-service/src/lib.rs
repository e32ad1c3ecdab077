//! Core service façade and bootstrap helpers.
//!
//! This crate wires a validated [`EngineConfig`] into the item sync core:
//! it opens the ledger database, builds the repositories and hands hosts a
//! single [`SyncService`] handle for linking, syncing and removing items.
//!
//! ```no_run
//! # async fn example(config: core_runtime::EngineConfig) -> core_service::Result<()> {
//! use core_service::SyncService;
//!
//! let service = SyncService::bootstrap(config).await?;
//! let family = service.create_family("Household").await?;
//! let item = service
//!     .link_item(family.id, "public-sandbox-token", "First Bank")
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::background::{BackgroundJob, JobId};
use chrono::NaiveDate;
use core_ledger::{
    create_pool, Account, AccountRepository, DatabaseConfig, Family, FamilyId, FamilyRepository,
    Item, ItemId, ItemRepository, SqliteAccountRepository, SqliteFamilyRepository,
    SqliteItemRepository,
};
use core_runtime::{DatabaseLocation, EngineConfig};
use core_sync::{ItemLifecycle, ItemSyncReport, ItemSyncer, JobDispatcher, JobOutcome};
use sqlx::SqlitePool;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct SyncService {
    pool: SqlitePool,
    families: Arc<SqliteFamilyRepository>,
    items: Arc<SqliteItemRepository>,
    accounts: Arc<SqliteAccountRepository>,
    syncer: Arc<ItemSyncer>,
    lifecycle: Arc<ItemLifecycle>,
    dispatcher: Arc<JobDispatcher>,
}

impl SyncService {
    /// Open the ledger described by `config` and wire up the engine.
    pub async fn bootstrap(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let db_config = match &config.database {
            DatabaseLocation::InMemory => DatabaseConfig::in_memory(),
            DatabaseLocation::File(path) => {
                DatabaseConfig::new(path.clone()).max_connections(config.max_connections)
            }
        };
        let pool = create_pool(db_config).await?;

        let families = Arc::new(SqliteFamilyRepository::new(pool.clone()));
        let items = Arc::new(SqliteItemRepository::new(pool.clone(), config.cipher.clone()));
        let accounts = Arc::new(SqliteAccountRepository::new(pool.clone()));

        let syncer = Arc::new(ItemSyncer::new(
            pool.clone(),
            items.clone(),
            accounts.clone(),
            config.provider.clone(),
            config.account_sync.clone(),
            config.clock.clone(),
        ));
        let lifecycle = Arc::new(
            ItemLifecycle::new(items.clone(), config.provider.clone(), config.scheduler.clone())
                .with_strict_revocation(config.strict_revocation),
        );
        let dispatcher = Arc::new(JobDispatcher::new(
            syncer.clone(),
            lifecycle.clone(),
            accounts.clone(),
            config.account_sync.clone(),
        ));

        info!(strict_revocation = config.strict_revocation, "Sync service ready");

        Ok(Self {
            pool,
            families,
            items,
            accounts,
            syncer,
            lifecycle,
            dispatcher,
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Dispatcher for hosts that run their own job queue.
    pub fn dispatcher(&self) -> Arc<JobDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub async fn create_family(&self, name: &str) -> Result<Family> {
        let family = Family::new(name);
        self.families.insert(&family).await?;
        Ok(family)
    }

    /// Exchange a public token and queue the new item's first sync.
    pub async fn link_item(&self, family_id: FamilyId, public_token: &str, name: &str) -> Result<Item> {
        Ok(self
            .lifecycle
            .create_from_public_token(family_id, public_token, name)
            .await?)
    }

    /// Sync an item inline rather than through the job queue.
    pub async fn sync_item(&self, item_id: ItemId, start_date: Option<NaiveDate>) -> Result<ItemSyncReport> {
        Ok(self.syncer.sync(item_id, start_date).await?)
    }

    pub async fn schedule_item_deletion(&self, item_id: ItemId) -> Result<JobId> {
        Ok(self.lifecycle.schedule_deletion(item_id).await?)
    }

    pub async fn remove_item(&self, item_id: ItemId) -> Result<()> {
        Ok(self.lifecycle.remove(item_id).await?)
    }

    /// Items of a family, most recently linked first.
    pub async fn items(&self, family_id: &FamilyId) -> Result<Vec<Item>> {
        Ok(self.items.list_ordered(family_id).await?)
    }

    pub async fn active_items(&self, family_id: &FamilyId) -> Result<Vec<Item>> {
        Ok(self.items.list_active(family_id).await?)
    }

    pub async fn accounts(&self, item_id: &ItemId) -> Result<Vec<Account>> {
        Ok(self.accounts.list_for_item(item_id).await?)
    }

    /// Run a job handed back by the host's queue.
    pub async fn dispatch(&self, job: BackgroundJob) -> Result<JobOutcome> {
        Ok(self.dispatcher.dispatch(job).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::provider::{
        AccessToken, AccountBalances, AggregationProvider, InvestmentsSnapshot, ItemHandle,
        LiabilitiesSnapshot, ProviderAccount, ProviderItem, TokenExchange, TransactionsDelta,
    };
    use bridge_traits::storage::PassthroughCipher;
    use core_sync::{in_process_queue, JobQueue};
    use mockall::mock;

    mock! {
        Provider {}

        #[async_trait]
        impl AggregationProvider for Provider {
            async fn exchange_public_token(&self, public_token: &str) -> BridgeResult<TokenExchange>;
            async fn get_item(&self, access_token: &AccessToken) -> BridgeResult<ProviderItem>;
            async fn get_item_accounts(&self, item: &ItemHandle) -> BridgeResult<Vec<ProviderAccount>>;
            async fn get_item_transactions(&self, item: &ItemHandle) -> BridgeResult<TransactionsDelta>;
            async fn get_item_investments(&self, item: &ItemHandle) -> BridgeResult<InvestmentsSnapshot>;
            async fn get_item_liabilities(&self, item: &ItemHandle) -> BridgeResult<LiabilitiesSnapshot>;
            async fn remove_item(&self, access_token: &AccessToken) -> BridgeResult<()>;
        }
    }

    fn provider() -> MockProvider {
        let mut provider = MockProvider::new();
        provider.expect_exchange_public_token().returning(|_| {
            Ok(TokenExchange {
                item_id: "item-sandbox".to_string(),
                access_token: AccessToken::new("access-sandbox"),
            })
        });
        provider.expect_get_item().returning(|_| {
            Ok(ProviderItem {
                item_id: "item-sandbox".to_string(),
                available_products: vec!["transactions".to_string()],
                billed_products: vec![],
            })
        });
        provider.expect_get_item_accounts().returning(|_| {
            Ok(vec![ProviderAccount {
                account_id: "acct-1".to_string(),
                name: "Checking".to_string(),
                official_name: None,
                mask: Some("1234".to_string()),
                account_type: "depository".to_string(),
                subtype: Some("checking".to_string()),
                balances: AccountBalances::default(),
            }])
        });
        provider.expect_get_item_transactions().returning(|_| {
            Ok(TransactionsDelta {
                cursor: "cursor-1".to_string(),
                ..Default::default()
            })
        });
        provider
    }

    async fn service(provider: MockProvider) -> (SyncService, JobQueue) {
        let (scheduler, queue) = in_process_queue();
        let config = EngineConfig::builder()
            .in_memory()
            .provider(Arc::new(provider))
            .scheduler(Arc::new(scheduler))
            .cipher(Arc::new(PassthroughCipher))
            .build()
            .unwrap();
        (SyncService::bootstrap(config).await.unwrap(), queue)
    }

    #[tokio::test]
    async fn test_link_item_queues_first_sync() {
        let (service, mut queue) = service(provider()).await;
        let family = service.create_family("Household").await.unwrap();

        let item = service
            .link_item(family.id, "public-sandbox", "First Bank")
            .await
            .unwrap();
        assert_eq!(service.items(&family.id).await.unwrap().len(), 1);

        let results = queue.run_pending(&service.dispatcher()).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].1, Ok(JobOutcome::ItemSynced(_))));

        let accounts = service.accounts(&item.id).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].provider_account_id, "acct-1");
    }

    #[tokio::test]
    async fn test_scheduled_deletion_hides_item_from_active_list() {
        let mut provider = provider();
        provider.expect_remove_item().times(1).returning(|_| Ok(()));
        let (service, mut queue) = service(provider).await;
        let family = service.create_family("Household").await.unwrap();
        let item = service
            .link_item(family.id, "public-sandbox", "First Bank")
            .await
            .unwrap();
        queue.run_pending(&service.dispatcher()).await;

        service.schedule_item_deletion(item.id).await.unwrap();
        assert!(service.active_items(&family.id).await.unwrap().is_empty());
        assert_eq!(service.items(&family.id).await.unwrap().len(), 1);

        let results = queue.run_pending(&service.dispatcher()).await;
        assert!(matches!(results[0].1, Ok(JobOutcome::ItemDestroyed)));
        assert!(service.items(&family.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inline_sync_of_unknown_item() {
        let (service, _queue) = service(provider()).await;
        let err = service.sync_item(ItemId::new(), None).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Sync(core_sync::SyncError::ItemNotFound { .. })
        ));
    }
}

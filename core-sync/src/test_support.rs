//! Fixtures shared by unit tests

use async_trait::async_trait;
use bridge_traits::background::{BackgroundJob, JobId, JobScheduler};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::provider::{
    AccessToken, AccountBalances, AggregationProvider, InvestmentsSnapshot, ItemHandle,
    LiabilitiesSnapshot, ProviderAccount, ProviderItem, TokenExchange, TransactionsDelta,
};
use bridge_traits::storage::PassthroughCipher;
use core_ledger::{
    create_test_pool, Account, AccountRepository, Family, FamilyRepository, Item, ItemRepository,
    SqliteAccountRepository, SqliteFamilyRepository, SqliteItemRepository,
};
use mockall::mock;
use sqlx::SqlitePool;
use std::sync::Arc;

mock! {
    pub Provider {}

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

mock! {
    pub Scheduler {}

    #[async_trait]
    impl JobScheduler for Scheduler {
        async fn enqueue(&self, job: BackgroundJob) -> BridgeResult<JobId>;
        async fn is_available(&self) -> bool;
    }
}

pub fn provider_account(id: &str) -> ProviderAccount {
    ProviderAccount {
        account_id: id.to_string(),
        name: format!("Account {}", id),
        official_name: None,
        mask: None,
        account_type: "depository".to_string(),
        subtype: None,
        balances: AccountBalances::default(),
    }
}

/// Pool with one family and one item.
pub async fn seed_item() -> (SqlitePool, Item) {
    let pool = create_test_pool().await.unwrap();
    let family = Family::new("Fixture family");
    SqliteFamilyRepository::new(pool.clone())
        .insert(&family)
        .await
        .unwrap();
    let item = Item::new(family.id, "item-fixture", "Fixture Bank", AccessToken::new("access-fixture"))
        .unwrap();
    SqliteItemRepository::new(pool.clone(), Arc::new(PassthroughCipher))
        .insert(&item)
        .await
        .unwrap();
    (pool, item)
}

/// Pool with one item holding the given provider accounts.
pub async fn seed_accounts(provider_ids: &[&str]) -> (SqlitePool, Item, Vec<Account>) {
    let (pool, item) = seed_item().await;
    let repo = SqliteAccountRepository::new(pool.clone());
    let mut accounts = Vec::new();
    for id in provider_ids {
        let (account, _) = repo
            .find_or_create(&Account::from_provider(&item, &provider_account(id)))
            .await
            .unwrap();
        accounts.push(account);
    }
    (pool, item, accounts)
}

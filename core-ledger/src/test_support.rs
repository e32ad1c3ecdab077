//! Fixtures shared by the ledger's unit tests

use crate::db::create_test_pool;
use crate::models::{Account, Family, Item};
use crate::repositories::{
    AccountRepository, FamilyRepository, ItemRepository, SqliteAccountRepository,
    SqliteFamilyRepository, SqliteItemRepository,
};
use bridge_traits::provider::{AccessToken, AccountBalances, ProviderAccount, ProviderTransaction};
use bridge_traits::storage::PassthroughCipher;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Fresh pool holding one family, one item and one account.
pub async fn seed_account(provider_account_id: &str) -> (SqlitePool, Item, Account) {
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

    let data = ProviderAccount {
        account_id: provider_account_id.to_string(),
        name: "Fixture account".to_string(),
        official_name: None,
        mask: None,
        account_type: "depository".to_string(),
        subtype: None,
        balances: AccountBalances::default(),
    };
    let (account, _) = SqliteAccountRepository::new(pool.clone())
        .find_or_create(&Account::from_provider(&item, &data))
        .await
        .unwrap();

    (pool, item, account)
}

pub fn provider_transaction(id: &str, account_id: &str, amount_cents: i64) -> ProviderTransaction {
    ProviderTransaction {
        transaction_id: id.to_string(),
        account_id: account_id.to_string(),
        amount: Decimal::new(amount_cents, 2),
        iso_currency_code: Some("USD".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        name: "Coffee".to_string(),
        merchant_name: None,
        category: None,
        pending: true,
    }
}

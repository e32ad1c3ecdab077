//! Integration tests for item sync
//!
//! These tests drive the public API against an in-memory ledger and a
//! scripted provider:
//! - Cursor persistence across incremental transaction syncs
//! - Sync timestamp written before the provider is contacted
//! - Idempotent account reconciliation
//! - Accounts owned by exactly one item
//! - Category rows stamped by the injected clock
//! - Rollback of a category whose writes fail part way
//! - Provider API errors isolated per category
//! - Item lifecycle driven through the in-process job queue
//! - Downstream account sync hook

use async_trait::async_trait;
use bridge_traits::account_sync::{AccountDataSync, LinkedAccount, NoopAccountSync};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::provider::{
    AccessToken, AccountBalances, AggregationProvider, CreditLiability, InvestmentsSnapshot,
    ItemHandle, LiabilitiesSnapshot, ProviderAccount, ProviderItem, ProviderTransaction,
    TokenExchange, TransactionsDelta,
};
use bridge_traits::storage::PassthroughCipher;
use bridge_traits::time::{Clock, FixedClock, SystemClock};
use chrono::{NaiveDate, TimeZone, Utc};
use core_ledger::stores::{liabilities, transactions};
use core_ledger::{
    create_test_pool, Account, AccountRepository, Family, FamilyRepository, Item, ItemRepository,
    SqliteAccountRepository, SqliteFamilyRepository, SqliteItemRepository,
};
use core_sync::{
    in_process_queue, CategoryStatus, ItemLifecycle, ItemSyncer, JobDispatcher, JobOutcome,
    SyncCategory, SyncError,
};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

// ============================================================================
// Scripted provider
// ============================================================================

/// A canned provider answer. `Refused` maps to a provider API error,
/// `Unreachable` to a transport error.
#[derive(Clone)]
enum Reply<T> {
    Data(T),
    Refused(&'static str),
    Unreachable,
}

impl<T: Clone> Reply<T> {
    fn get(&self) -> BridgeResult<T> {
        match self {
            Self::Data(value) => Ok(value.clone()),
            Self::Refused(code) => Err(BridgeError::provider_api(*code, "refused")),
            Self::Unreachable => Err(BridgeError::Transport("unreachable".to_string())),
        }
    }
}

struct Script {
    item: Reply<ProviderItem>,
    accounts: Vec<ProviderAccount>,
    transactions: Reply<TransactionsDelta>,
    investments: Reply<InvestmentsSnapshot>,
    liabilities: Reply<LiabilitiesSnapshot>,
    seen_cursors: Vec<Option<String>>,
    revoked: Vec<String>,
}

struct ScriptedProvider {
    script: Mutex<Script>,
}

impl ScriptedProvider {
    fn new(products: &[&str], accounts: &[&str]) -> Self {
        Self {
            script: Mutex::new(Script {
                item: Reply::Data(ProviderItem {
                    item_id: "item-1".to_string(),
                    available_products: products.iter().map(|p| p.to_string()).collect(),
                    billed_products: vec![],
                }),
                accounts: accounts.iter().map(|id| account(id, "100.00")).collect(),
                transactions: Reply::Data(TransactionsDelta::default()),
                investments: Reply::Data(InvestmentsSnapshot::default()),
                liabilities: Reply::Data(LiabilitiesSnapshot::default()),
                seen_cursors: Vec::new(),
                revoked: Vec::new(),
            }),
        }
    }

    async fn script(&self) -> tokio::sync::MutexGuard<'_, Script> {
        self.script.lock().await
    }
}

#[async_trait]
impl AggregationProvider for ScriptedProvider {
    async fn exchange_public_token(&self, public_token: &str) -> BridgeResult<TokenExchange> {
        if public_token == "public-bad" {
            return Err(BridgeError::provider_api("INVALID_PUBLIC_TOKEN", "bad token"));
        }
        Ok(TokenExchange {
            item_id: "item-1".to_string(),
            access_token: AccessToken::new("access-sandbox-1"),
        })
    }

    async fn get_item(&self, _access_token: &AccessToken) -> BridgeResult<ProviderItem> {
        self.script().await.item.get()
    }

    async fn get_item_accounts(&self, _item: &ItemHandle) -> BridgeResult<Vec<ProviderAccount>> {
        Ok(self.script().await.accounts.clone())
    }

    async fn get_item_transactions(&self, item: &ItemHandle) -> BridgeResult<TransactionsDelta> {
        let mut script = self.script().await;
        script.seen_cursors.push(item.cursor.clone());
        script.transactions.get()
    }

    async fn get_item_investments(&self, _item: &ItemHandle) -> BridgeResult<InvestmentsSnapshot> {
        self.script().await.investments.get()
    }

    async fn get_item_liabilities(&self, _item: &ItemHandle) -> BridgeResult<LiabilitiesSnapshot> {
        self.script().await.liabilities.get()
    }

    async fn remove_item(&self, access_token: &AccessToken) -> BridgeResult<()> {
        self.script()
            .await
            .revoked
            .push(access_token.expose().to_string());
        Ok(())
    }
}

/// Downstream hook that records every call.
#[derive(Default)]
struct RecordingAccountSync {
    calls: StdMutex<Vec<(LinkedAccount, Option<NaiveDate>)>>,
}

#[async_trait]
impl AccountDataSync for RecordingAccountSync {
    async fn sync_account(&self, account: &LinkedAccount, start_date: Option<NaiveDate>) -> BridgeResult<()> {
        self.calls.lock().unwrap().push((account.clone(), start_date));
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn account(id: &str, current: &str) -> ProviderAccount {
    ProviderAccount {
        account_id: id.to_string(),
        name: format!("Account {}", id),
        official_name: None,
        mask: Some("0000".to_string()),
        account_type: "depository".to_string(),
        subtype: Some("checking".to_string()),
        balances: AccountBalances {
            current: Some(current.parse().unwrap()),
            available: None,
            limit: None,
            iso_currency_code: Some("USD".to_string()),
        },
    }
}

fn transaction(id: &str, account_id: &str, amount: &str, pending: bool) -> ProviderTransaction {
    ProviderTransaction {
        transaction_id: id.to_string(),
        account_id: account_id.to_string(),
        amount: amount.parse().unwrap(),
        iso_currency_code: Some("USD".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        name: "Grocery".to_string(),
        merchant_name: None,
        category: None,
        pending,
    }
}

struct Harness {
    pool: SqlitePool,
    items: Arc<SqliteItemRepository>,
    accounts: Arc<SqliteAccountRepository>,
    provider: Arc<ScriptedProvider>,
    family: Family,
}

impl Harness {
    async fn new(provider: ScriptedProvider) -> Self {
        let pool = create_test_pool().await.unwrap();
        let family = Family::new("Test family");
        SqliteFamilyRepository::new(pool.clone())
            .insert(&family)
            .await
            .unwrap();

        Self {
            items: Arc::new(SqliteItemRepository::new(pool.clone(), Arc::new(PassthroughCipher))),
            accounts: Arc::new(SqliteAccountRepository::new(pool.clone())),
            provider: Arc::new(provider),
            family,
            pool,
        }
    }

    async fn seed_item(&self) -> Item {
        self.seed_item_named("item-1").await
    }

    async fn seed_item_named(&self, provider_item_id: &str) -> Item {
        let item = Item::new(
            self.family.id,
            provider_item_id,
            "Test Bank",
            AccessToken::new(format!("access-{}", provider_item_id)),
        )
        .unwrap();
        self.items.insert(&item).await.unwrap();
        item
    }

    fn syncer_with(&self, account_sync: Arc<dyn AccountDataSync>, clock: Arc<dyn Clock>) -> ItemSyncer {
        ItemSyncer::new(
            self.pool.clone(),
            self.items.clone(),
            self.accounts.clone(),
            self.provider.clone(),
            account_sync,
            clock,
        )
    }

    fn syncer(&self) -> ItemSyncer {
        self.syncer_with(Arc::new(NoopAccountSync), Arc::new(SystemClock))
    }

    async fn account(&self, item: &Item, provider_account_id: &str) -> Account {
        self.accounts
            .find_by_provider_account(&item.id, provider_account_id)
            .await
            .unwrap()
            .unwrap()
    }

    async fn reload(&self, item: &Item) -> Item {
        self.items.find_by_id(&item.id).await.unwrap().unwrap()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_incremental_transactions_follow_cursor() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1"])).await;
    let item = harness.seed_item().await;

    harness.provider.script().await.transactions = Reply::Data(TransactionsDelta {
        added: vec![transaction("t1", "A1", "12.50", true)],
        modified: vec![],
        removed: vec![],
        cursor: "c1".to_string(),
    });
    let report = harness.syncer().sync(item.id, None).await.unwrap();
    assert!(matches!(
        report.status(SyncCategory::Transactions),
        Some(CategoryStatus::Applied(stats)) if stats.upserted == 1
    ));
    assert_eq!(harness.reload(&item).await.next_cursor.as_deref(), Some("c1"));

    harness.provider.script().await.transactions = Reply::Data(TransactionsDelta {
        added: vec![],
        modified: vec![transaction("t1", "A1", "12.75", false)],
        removed: vec![],
        cursor: "c2".to_string(),
    });
    harness.syncer().sync(item.id, None).await.unwrap();

    let a1 = harness.account(&item, "A1").await;
    let stored = transactions::list_for_account(&harness.pool, &a1.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, Decimal::new(1275, 2));
    assert!(!stored[0].pending);

    assert_eq!(harness.reload(&item).await.next_cursor.as_deref(), Some("c2"));
    assert_eq!(
        harness.provider.script().await.seen_cursors,
        vec![None, Some("c1".to_string())]
    );
}

#[tokio::test]
async fn test_sync_timestamp_written_before_provider_calls() {
    let provider = ScriptedProvider::new(&["transactions"], &["A1"]);
    provider.script().await.item = Reply::Refused("ITEM_LOGIN_REQUIRED");
    let harness = Harness::new(provider).await;
    let item = harness.seed_item().await;

    let started = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let syncer = harness.syncer_with(Arc::new(NoopAccountSync), Arc::new(FixedClock::new(started)));

    let err = syncer.sync(item.id, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Provider { method: "get_item", .. }));
    assert_eq!(harness.reload(&item).await.last_synced_at, Some(started));
}

#[tokio::test]
async fn test_account_reconciliation_is_idempotent() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1"])).await;
    let item = harness.seed_item().await;

    harness.syncer().sync(item.id, None).await.unwrap();
    let first = harness.account(&item, "A1").await;

    harness.provider.script().await.accounts = vec![account("A1", "250.10")];
    harness.syncer().sync(item.id, None).await.unwrap();

    let listed = harness.accounts.list_for_item(&item.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[0].current_balance, Some(Decimal::new(25010, 2)));
}

#[tokio::test]
async fn test_items_sharing_a_provider_account_id_own_separate_accounts() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1"])).await;
    let first = harness.seed_item_named("item-1").await;
    let second = harness.seed_item_named("item-2").await;

    harness.provider.script().await.transactions = Reply::Data(TransactionsDelta {
        added: vec![transaction("t1", "A1", "9.99", false)],
        modified: vec![],
        removed: vec![],
        cursor: "c1".to_string(),
    });
    harness.syncer().sync(first.id, None).await.unwrap();
    let report = harness.syncer().sync(second.id, None).await.unwrap();
    assert_eq!(report.accounts_reconciled, 1);

    let owned_by_first = harness.accounts.list_for_item(&first.id).await.unwrap();
    let owned_by_second = harness.accounts.list_for_item(&second.id).await.unwrap();
    assert_eq!(owned_by_first.len(), 1);
    assert_eq!(owned_by_second.len(), 1);
    assert_ne!(owned_by_first[0].id, owned_by_second[0].id);

    assert!(harness.items.delete(&first.id).await.unwrap());
    let kept = harness.account(&second, "A1").await;
    assert_eq!(kept.item_id, second.id);
    let stored = transactions::list_for_account(&harness.pool, &kept.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].provider_transaction_id, "t1");
}

#[tokio::test]
async fn test_category_writes_use_sync_clock() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1"])).await;
    let item = harness.seed_item().await;
    harness.provider.script().await.transactions = Reply::Data(TransactionsDelta {
        added: vec![transaction("t1", "A1", "3.20", false)],
        modified: vec![],
        removed: vec![],
        cursor: "c1".to_string(),
    });

    let pinned = Utc.with_ymd_and_hms(2023, 11, 5, 9, 30, 0).unwrap();
    harness
        .syncer_with(Arc::new(NoopAccountSync), Arc::new(FixedClock::new(pinned)))
        .sync(item.id, None)
        .await
        .unwrap();

    let (created_at, updated_at): (i64, i64) = sqlx::query_as(
        "SELECT created_at, updated_at FROM transactions WHERE provider_transaction_id = 't1'",
    )
    .fetch_one(&harness.pool)
    .await
    .unwrap();
    assert_eq!(created_at, pinned.timestamp());
    assert_eq!(updated_at, pinned.timestamp());

    let (item_updated_at,): (i64,) = sqlx::query_as("SELECT updated_at FROM items WHERE id = ?")
        .bind(item.id.as_str())
        .fetch_one(&harness.pool)
        .await
        .unwrap();
    assert_eq!(item_updated_at, pinned.timestamp());
}

#[tokio::test]
async fn test_failed_category_write_rolls_back_whole_scope() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1", "A2"])).await;
    let item = harness.seed_item().await;

    sqlx::query(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON transactions \
         WHEN NEW.provider_transaction_id = 'boom' \
         BEGIN SELECT RAISE(ABORT, 'boom'); END;",
    )
    .execute(&harness.pool)
    .await
    .unwrap();

    harness.provider.script().await.transactions = Reply::Data(TransactionsDelta {
        added: vec![
            transaction("t1", "A1", "5.00", false),
            transaction("boom", "A2", "7.00", false),
        ],
        modified: vec![],
        removed: vec![],
        cursor: "c1".to_string(),
    });

    let err = harness.syncer().sync(item.id, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Ledger(_)));

    let a1 = harness.account(&item, "A1").await;
    assert!(transactions::list_for_account(&harness.pool, &a1.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(harness.reload(&item).await.next_cursor, None);
}

#[tokio::test]
async fn test_investments_refusal_does_not_block_liabilities() {
    let provider = ScriptedProvider::new(&["investments", "liabilities"], &["A1"]);
    {
        let mut script = provider.script().await;
        script.investments = Reply::Refused("PRODUCT_NOT_READY");
        script.liabilities = Reply::Data(LiabilitiesSnapshot {
            credit: vec![CreditLiability {
                account_id: "A1".to_string(),
                is_overdue: Some(false),
                last_payment_amount: None,
                last_statement_balance: Some(Decimal::new(42000, 2)),
                minimum_payment_amount: Some(Decimal::new(2500, 2)),
                next_payment_due_date: NaiveDate::from_ymd_opt(2024, 2, 1),
                purchase_apr: None,
            }],
            mortgage: vec![],
            student: vec![],
        });
        script.transactions = Reply::Unreachable;
    }
    let harness = Harness::new(provider).await;
    let item = harness.seed_item().await;

    let report = harness.syncer().sync(item.id, None).await.unwrap();

    // Investment-capable items never fetch transactions.
    assert_eq!(
        report.status(SyncCategory::Transactions),
        Some(&CategoryStatus::Skipped)
    );
    assert_eq!(
        report.status(SyncCategory::Investments),
        Some(&CategoryStatus::Unavailable)
    );
    assert!(matches!(
        report.status(SyncCategory::Liabilities),
        Some(CategoryStatus::Applied(_))
    ));
    assert!(harness.provider.script().await.seen_cursors.is_empty());

    let a1 = harness.account(&item, "A1").await;
    let credit = liabilities::find_credit(&harness.pool, &a1.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(credit.minimum_payment_amount, Some(Decimal::new(2500, 2)));
}

#[tokio::test]
async fn test_transport_failure_aborts_sync() {
    let provider = ScriptedProvider::new(&["transactions"], &["A1"]);
    provider.script().await.transactions = Reply::Unreachable;
    let harness = Harness::new(provider).await;
    let item = harness.seed_item().await;

    let err = harness.syncer().sync(item.id, None).await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Provider { method: "get_item_transactions", .. }
    ));
}

#[tokio::test]
async fn test_downstream_sync_receives_every_account() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1", "A2"])).await;
    let item = harness.seed_item().await;
    let recorder = Arc::new(RecordingAccountSync::default());
    let start = NaiveDate::from_ymd_opt(2024, 1, 1);

    harness
        .syncer_with(recorder.clone(), Arc::new(SystemClock))
        .sync(item.id, start)
        .await
        .unwrap();

    let calls = recorder.calls.lock().unwrap();
    let mut provider_ids: Vec<_> = calls
        .iter()
        .map(|(linked, _)| linked.provider_account_id.as_str())
        .collect();
    provider_ids.sort();
    assert_eq!(provider_ids, vec!["A1", "A2"]);
    assert!(calls.iter().all(|(linked, date)| {
        linked.item_id == item.id.to_string() && *date == start
    }));
}

#[tokio::test]
async fn test_item_lifecycle_through_job_queue() {
    let harness = Harness::new(ScriptedProvider::new(&["transactions"], &["A1"])).await;
    let (scheduler, mut queue) = in_process_queue();
    let scheduler = Arc::new(scheduler);

    let syncer = Arc::new(harness.syncer());
    let lifecycle = Arc::new(ItemLifecycle::new(
        harness.items.clone(),
        harness.provider.clone(),
        scheduler.clone(),
    ));
    let dispatcher = JobDispatcher::new(
        syncer,
        lifecycle.clone(),
        harness.accounts.clone(),
        Arc::new(NoopAccountSync),
    );

    let err = lifecycle
        .create_from_public_token(harness.family.id, "public-bad", "Bank")
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::CredentialExchange(_)));

    let item = lifecycle
        .create_from_public_token(harness.family.id, "public-ok", "  Test Bank ")
        .await
        .unwrap();
    assert_eq!(item.name, "Test Bank");

    let results = queue.run_pending(&dispatcher).await;
    assert_eq!(results.len(), 1);
    assert!(matches!(&results[0].1, Ok(JobOutcome::ItemSynced(report)) if report.accounts_reconciled == 1));

    lifecycle.schedule_deletion(item.id).await.unwrap();
    assert!(harness.reload(&item).await.scheduled_for_deletion);

    let results = queue.run_pending(&dispatcher).await;
    assert!(matches!(results[0].1, Ok(JobOutcome::ItemDestroyed)));
    assert!(harness.items.find_by_id(&item.id).await.unwrap().is_none());
    assert!(harness.accounts.list_for_item(&item.id).await.unwrap().is_empty());
    assert_eq!(
        harness.provider.script().await.revoked,
        vec!["access-sandbox-1".to_string()]
    );
}

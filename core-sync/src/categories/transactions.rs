//! Cash transactions
//!
//! Applies an incremental delta: `added` and `modified` are written by
//! provider transaction id, `removed` are deleted by provider transaction id.
//! The delta's cursor is stored on the item in the same scope.

use super::CategoryStats;
use crate::error::Result;
use bridge_traits::provider::{for_account, ProviderTransaction, RemovedTransaction, TransactionsDelta};
use core_ledger::stores::{items, transactions};
use core_ledger::{Account, Item};
use sqlx::SqliteConnection;
use tracing::debug;

/// Apply `delta` to every account and advance the item's cursor.
pub async fn apply_delta(
    conn: &mut SqliteConnection,
    item: &Item,
    accounts: &[Account],
    delta: &TransactionsDelta,
    now: i64,
) -> Result<CategoryStats> {
    let mut stats = CategoryStats::default();

    for account in accounts {
        let id = account.provider_account_id.as_str();
        stats += apply_account(
            conn,
            account,
            &for_account(&delta.added, id),
            &for_account(&delta.modified, id),
            &for_account(&delta.removed, id),
            now,
        )
        .await?;
    }

    items::set_next_cursor(conn, &item.id, &delta.cursor, now).await?;

    Ok(stats)
}

/// Apply one account's share of a delta.
pub async fn apply_account(
    conn: &mut SqliteConnection,
    account: &Account,
    added: &[ProviderTransaction],
    modified: &[ProviderTransaction],
    removed: &[RemovedTransaction],
    now: i64,
) -> Result<CategoryStats> {
    let mut stats = CategoryStats::default();

    for data in added {
        transactions::upsert(conn, &account.id, data, now).await?;
        stats.upserted += 1;
    }

    for data in modified {
        if !transactions::update(conn, &account.id, data, now).await? {
            debug!(
                account_id = %account.id,
                transaction_id = %data.transaction_id,
                "Modified transaction not stored yet, inserting"
            );
            transactions::upsert(conn, &account.id, data, now).await?;
        }
        stats.upserted += 1;
    }

    for data in removed {
        if transactions::delete(conn, &account.id, &data.transaction_id).await? {
            stats.removed += 1;
        }
    }

    Ok(stats)
}

//! Cash transaction store

use crate::error::Result;
use crate::models::{parse_decimal, AccountId, Transaction};
use bridge_traits::provider::ProviderTransaction;
use chrono::NaiveDate;
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    account_id: String,
    provider_transaction_id: String,
    amount: String,
    currency: Option<String>,
    date: NaiveDate,
    name: String,
    merchant_name: Option<String>,
    category: Option<String>,
    pending: bool,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = crate::error::LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        Ok(Transaction {
            id: row.id,
            account_id: AccountId::from_string(&row.account_id)?,
            provider_transaction_id: row.provider_transaction_id,
            amount: parse_decimal(&row.amount)?,
            currency: row.currency,
            date: row.date,
            name: row.name,
            merchant_name: row.merchant_name,
            category: row.category,
            pending: row.pending,
        })
    }
}

/// Insert the transaction, or overwrite the row with the same provider id.
/// `now` becomes `updated_at`, and `created_at` on insert.
pub async fn upsert(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    data: &ProviderTransaction,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, account_id, provider_transaction_id, amount, currency, date,
            name, merchant_name, category, pending, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id, provider_transaction_id) DO UPDATE SET
            amount = excluded.amount,
            currency = excluded.currency,
            date = excluded.date,
            name = excluded.name,
            merchant_name = excluded.merchant_name,
            category = excluded.category,
            pending = excluded.pending,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(account_id.as_str())
    .bind(&data.transaction_id)
    .bind(data.amount.to_string())
    .bind(&data.iso_currency_code)
    .bind(data.date)
    .bind(&data.name)
    .bind(&data.merchant_name)
    .bind(&data.category)
    .bind(data.pending)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Update an existing transaction by provider id.
///
/// # Returns
/// `false` when no row matched
pub async fn update(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    data: &ProviderTransaction,
    now: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE transactions SET
            amount = ?,
            currency = ?,
            date = ?,
            name = ?,
            merchant_name = ?,
            category = ?,
            pending = ?,
            updated_at = ?
        WHERE account_id = ? AND provider_transaction_id = ?
        "#,
    )
    .bind(data.amount.to_string())
    .bind(&data.iso_currency_code)
    .bind(data.date)
    .bind(&data.name)
    .bind(&data.merchant_name)
    .bind(&data.category)
    .bind(data.pending)
    .bind(now)
    .bind(account_id.as_str())
    .bind(&data.transaction_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a transaction by provider id.
///
/// # Returns
/// `false` when no row matched
pub async fn delete(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    provider_transaction_id: &str,
) -> Result<bool> {
    let result = sqlx::query(
        "DELETE FROM transactions WHERE account_id = ? AND provider_transaction_id = ?",
    )
    .bind(account_id.as_str())
    .bind(provider_transaction_id)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Transactions of an account, newest first.
pub async fn list_for_account<'e, E>(executor: E, account_id: &AccountId) -> Result<Vec<Transaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, TransactionRow>(
        r#"
        SELECT id, account_id, provider_transaction_id, amount, currency, date,
               name, merchant_name, category, pending
        FROM transactions
        WHERE account_id = ?
        ORDER BY date DESC, provider_transaction_id
        "#,
    )
    .bind(account_id.as_str())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Transaction::try_from).collect()
}

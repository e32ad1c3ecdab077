//! Investment store: shared securities catalog, holdings and investment
//! transactions

use crate::error::{LedgerError, Result};
use crate::models::{
    decimal_to_text, parse_decimal, parse_optional_decimal, AccountId, Holding,
    InvestmentTransaction, Security,
};
use bridge_traits::provider::{ProviderHolding, ProviderInvestmentTransaction, ProviderSecurity};
use chrono::NaiveDate;
use sqlx::{Executor, FromRow, Sqlite, SqliteConnection};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct SecurityRow {
    id: String,
    provider_security_id: String,
    name: Option<String>,
    ticker_symbol: Option<String>,
    security_type: Option<String>,
    close_price: Option<String>,
    currency: Option<String>,
}

impl TryFrom<SecurityRow> for Security {
    type Error = LedgerError;

    fn try_from(row: SecurityRow) -> Result<Self> {
        Ok(Security {
            id: row.id,
            provider_security_id: row.provider_security_id,
            name: row.name,
            ticker_symbol: row.ticker_symbol,
            security_type: row.security_type,
            close_price: parse_optional_decimal(row.close_price)?,
            currency: row.currency,
        })
    }
}

#[derive(Debug, FromRow)]
struct HoldingRow {
    id: String,
    account_id: String,
    security_id: String,
    quantity: String,
    institution_price: String,
    institution_value: Option<String>,
    cost_basis: Option<String>,
    currency: Option<String>,
}

impl TryFrom<HoldingRow> for Holding {
    type Error = LedgerError;

    fn try_from(row: HoldingRow) -> Result<Self> {
        Ok(Holding {
            id: row.id,
            account_id: AccountId::from_string(&row.account_id)?,
            security_id: row.security_id,
            quantity: parse_decimal(&row.quantity)?,
            institution_price: parse_decimal(&row.institution_price)?,
            institution_value: parse_optional_decimal(row.institution_value)?,
            cost_basis: parse_optional_decimal(row.cost_basis)?,
            currency: row.currency,
        })
    }
}

#[derive(Debug, FromRow)]
struct InvestmentTransactionRow {
    id: String,
    account_id: String,
    provider_investment_transaction_id: String,
    security_id: Option<String>,
    date: NaiveDate,
    name: String,
    kind: String,
    quantity: String,
    price: String,
    amount: String,
    fees: Option<String>,
    currency: Option<String>,
}

impl TryFrom<InvestmentTransactionRow> for InvestmentTransaction {
    type Error = LedgerError;

    fn try_from(row: InvestmentTransactionRow) -> Result<Self> {
        Ok(InvestmentTransaction {
            id: row.id,
            account_id: AccountId::from_string(&row.account_id)?,
            provider_investment_transaction_id: row.provider_investment_transaction_id,
            security_id: row.security_id,
            date: row.date,
            name: row.name,
            kind: row.kind,
            quantity: parse_decimal(&row.quantity)?,
            price: parse_decimal(&row.price)?,
            amount: parse_decimal(&row.amount)?,
            fees: parse_optional_decimal(row.fees)?,
            currency: row.currency,
        })
    }
}

/// Insert or refresh a catalog security.
///
/// # Returns
/// The local security id
pub async fn upsert_security(
    conn: &mut SqliteConnection,
    data: &ProviderSecurity,
    now: i64,
) -> Result<String> {
    let (id,): (String,) = sqlx::query_as(
        r#"
        INSERT INTO securities (
            id, provider_security_id, name, ticker_symbol, security_type,
            close_price, currency, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (provider_security_id) DO UPDATE SET
            name = excluded.name,
            ticker_symbol = excluded.ticker_symbol,
            security_type = excluded.security_type,
            close_price = excluded.close_price,
            currency = excluded.currency,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&data.security_id)
    .bind(&data.name)
    .bind(&data.ticker_symbol)
    .bind(&data.security_type)
    .bind(decimal_to_text(data.close_price))
    .bind(&data.iso_currency_code)
    .bind(now)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// Insert or refresh the holding of `security_id` in an account.
pub async fn upsert_holding(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    security_id: &str,
    data: &ProviderHolding,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO holdings (
            id, account_id, security_id, quantity, institution_price,
            institution_value, cost_basis, currency, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id, security_id) DO UPDATE SET
            quantity = excluded.quantity,
            institution_price = excluded.institution_price,
            institution_value = excluded.institution_value,
            cost_basis = excluded.cost_basis,
            currency = excluded.currency,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(account_id.as_str())
    .bind(security_id)
    .bind(data.quantity.to_string())
    .bind(data.institution_price.to_string())
    .bind(decimal_to_text(data.institution_value))
    .bind(decimal_to_text(data.cost_basis))
    .bind(&data.iso_currency_code)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Delete holdings of an account whose security is not in `keep`.
///
/// # Returns
/// Number of holdings deleted
pub async fn delete_holdings_except(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    keep: &[String],
) -> Result<u64> {
    let keep_json =
        serde_json::to_string(keep).map_err(|e| LedgerError::Serialization(e.to_string()))?;

    let result = sqlx::query(
        r#"
        DELETE FROM holdings
        WHERE account_id = ?
          AND security_id NOT IN (SELECT value FROM json_each(?))
        "#,
    )
    .bind(account_id.as_str())
    .bind(keep_json)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Insert or refresh an investment transaction by provider id.
pub async fn upsert_investment_transaction(
    conn: &mut SqliteConnection,
    account_id: &AccountId,
    security_id: Option<&str>,
    data: &ProviderInvestmentTransaction,
    now: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO investment_transactions (
            id, account_id, provider_investment_transaction_id, security_id, date,
            name, kind, quantity, price, amount, fees, currency, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (account_id, provider_investment_transaction_id) DO UPDATE SET
            security_id = excluded.security_id,
            date = excluded.date,
            name = excluded.name,
            kind = excluded.kind,
            quantity = excluded.quantity,
            price = excluded.price,
            amount = excluded.amount,
            fees = excluded.fees,
            currency = excluded.currency,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(account_id.as_str())
    .bind(&data.investment_transaction_id)
    .bind(security_id)
    .bind(data.date)
    .bind(&data.name)
    .bind(&data.kind)
    .bind(data.quantity.to_string())
    .bind(data.price.to_string())
    .bind(data.amount.to_string())
    .bind(decimal_to_text(data.fees))
    .bind(&data.iso_currency_code)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn find_security<'e, E>(executor: E, provider_security_id: &str) -> Result<Option<Security>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, SecurityRow>(
        r#"
        SELECT id, provider_security_id, name, ticker_symbol, security_type,
               close_price, currency
        FROM securities
        WHERE provider_security_id = ?
        "#,
    )
    .bind(provider_security_id)
    .fetch_optional(executor)
    .await?;

    row.map(Security::try_from).transpose()
}

pub async fn list_holdings<'e, E>(executor: E, account_id: &AccountId) -> Result<Vec<Holding>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, HoldingRow>(
        r#"
        SELECT id, account_id, security_id, quantity, institution_price,
               institution_value, cost_basis, currency
        FROM holdings
        WHERE account_id = ?
        ORDER BY security_id
        "#,
    )
    .bind(account_id.as_str())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(Holding::try_from).collect()
}

pub async fn list_investment_transactions<'e, E>(
    executor: E,
    account_id: &AccountId,
) -> Result<Vec<InvestmentTransaction>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, InvestmentTransactionRow>(
        r#"
        SELECT id, account_id, provider_investment_transaction_id, security_id, date,
               name, kind, quantity, price, amount, fees, currency
        FROM investment_transactions
        WHERE account_id = ?
        ORDER BY date DESC, provider_investment_transaction_id
        "#,
    )
    .bind(account_id.as_str())
    .fetch_all(executor)
    .await?;

    rows.into_iter().map(InvestmentTransaction::try_from).collect()
}

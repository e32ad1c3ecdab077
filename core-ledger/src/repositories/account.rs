//! Account repository trait and implementation

use crate::error::{LedgerError, Result};
use crate::models::{
    decimal_to_text, parse_optional_decimal, Account, AccountId, FamilyId, ItemId,
};
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

/// Account repository interface
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Insert `candidate` unless its item already holds an account with the
    /// same provider account id. Two items never share an account row.
    ///
    /// # Returns
    /// The stored account and whether it was created by this call
    async fn find_or_create(&self, candidate: &Account) -> Result<(Account, bool)>;

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>>;

    async fn find_by_provider_account(
        &self,
        item_id: &ItemId,
        provider_account_id: &str,
    ) -> Result<Option<Account>>;

    /// Overwrite the snapshot columns of an existing account
    async fn update_snapshot(&self, account: &Account) -> Result<()>;

    async fn list_for_item(&self, item_id: &ItemId) -> Result<Vec<Account>>;
}

/// SQLite implementation of AccountRepository
pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AccountRow {
    id: String,
    item_id: String,
    family_id: String,
    provider_account_id: String,
    name: String,
    official_name: Option<String>,
    mask: Option<String>,
    account_type: String,
    subtype: Option<String>,
    current_balance: Option<String>,
    available_balance: Option<String>,
    credit_limit: Option<String>,
    currency: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = LedgerError;

    fn try_from(row: AccountRow) -> Result<Self> {
        Ok(Account {
            id: AccountId::from_string(&row.id)?,
            item_id: ItemId::from_string(&row.item_id)?,
            family_id: FamilyId::from_string(&row.family_id)?,
            provider_account_id: row.provider_account_id,
            name: row.name,
            official_name: row.official_name,
            mask: row.mask,
            account_type: row.account_type,
            subtype: row.subtype,
            current_balance: parse_optional_decimal(row.current_balance)?,
            available_balance: parse_optional_decimal(row.available_balance)?,
            credit_limit: parse_optional_decimal(row.credit_limit)?,
            currency: row.currency,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, item_id, family_id, provider_account_id, name, official_name, \
     mask, account_type, subtype, current_balance, available_balance, credit_limit, currency, \
     created_at, updated_at";

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn find_or_create(&self, candidate: &Account) -> Result<(Account, bool)> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (
                id, item_id, family_id, provider_account_id, name, official_name,
                mask, account_type, subtype, current_balance, available_balance,
                credit_limit, currency, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (item_id, provider_account_id) DO NOTHING
            "#,
        )
        .bind(candidate.id.as_str())
        .bind(candidate.item_id.as_str())
        .bind(candidate.family_id.as_str())
        .bind(&candidate.provider_account_id)
        .bind(&candidate.name)
        .bind(&candidate.official_name)
        .bind(&candidate.mask)
        .bind(&candidate.account_type)
        .bind(&candidate.subtype)
        .bind(decimal_to_text(candidate.current_balance))
        .bind(decimal_to_text(candidate.available_balance))
        .bind(decimal_to_text(candidate.credit_limit))
        .bind(&candidate.currency)
        .bind(candidate.created_at)
        .bind(candidate.updated_at)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        let account = self
            .find_by_provider_account(&candidate.item_id, &candidate.provider_account_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("account", &candidate.provider_account_id))?;

        Ok((account, created))
    }

    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_provider_account(
        &self,
        item_id: &ItemId,
        provider_account_id: &str,
    ) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE item_id = ? AND provider_account_id = ?",
            ACCOUNT_COLUMNS
        ))
        .bind(item_id.as_str())
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Account::try_from).transpose()
    }

    async fn update_snapshot(&self, account: &Account) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                name = ?,
                official_name = ?,
                mask = ?,
                account_type = ?,
                subtype = ?,
                current_balance = ?,
                available_balance = ?,
                credit_limit = ?,
                currency = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.name)
        .bind(&account.official_name)
        .bind(&account.mask)
        .bind(&account.account_type)
        .bind(&account.subtype)
        .bind(decimal_to_text(account.current_balance))
        .bind(decimal_to_text(account.available_balance))
        .bind(decimal_to_text(account.credit_limit))
        .bind(&account.currency)
        .bind(account.updated_at)
        .bind(account.id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::not_found("account", account.id));
        }
        Ok(())
    }

    async fn list_for_item(&self, item_id: &ItemId) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {} FROM accounts WHERE item_id = ? ORDER BY created_at, provider_account_id",
            ACCOUNT_COLUMNS
        ))
        .bind(item_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(Account::try_from)
            .collect::<Result<Vec<_>>>()
    }
}

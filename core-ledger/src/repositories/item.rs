//! Item repository trait and implementation
//!
//! Access credentials are sealed with the host's [`CredentialCipher`] on the
//! way in and opened on the way out; the plaintext never reaches the database.

use crate::error::{LedgerError, Result};
use crate::models::{timestamp_to_datetime, FamilyId, Item, ItemId, ProductSet};
use async_trait::async_trait;
use bridge_traits::provider::AccessToken;
use bridge_traits::storage::CredentialCipher;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;

/// Item repository interface
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Insert a new item
    ///
    /// # Errors
    /// Returns error if validation fails, the provider item id is already
    /// linked, or a database error occurs
    async fn insert(&self, item: &Item) -> Result<()>;

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<Item>>;

    async fn find_by_provider_item_id(&self, provider_item_id: &str) -> Result<Option<Item>>;

    /// All items of a family, most recently created first
    async fn list_ordered(&self, family_id: &FamilyId) -> Result<Vec<Item>>;

    /// Items of a family that are not scheduled for deletion, most recently
    /// created first
    async fn list_active(&self, family_id: &FamilyId) -> Result<Vec<Item>>;

    /// Record the start of a sync
    async fn touch_last_synced(&self, id: &ItemId, at: DateTime<Utc>) -> Result<()>;

    /// Replace the stored product capability sets
    async fn update_products(
        &self,
        id: &ItemId,
        available: &ProductSet,
        billed: &ProductSet,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn mark_scheduled_for_deletion(&self, id: &ItemId) -> Result<()>;

    /// Delete an item; accounts and their data cascade
    ///
    /// # Returns
    /// - `Ok(true)` if the item was deleted
    /// - `Ok(false)` if it did not exist
    async fn delete(&self, id: &ItemId) -> Result<bool>;
}

/// SQLite implementation of ItemRepository
pub struct SqliteItemRepository {
    pool: SqlitePool,
    cipher: Arc<dyn CredentialCipher>,
}

impl SqliteItemRepository {
    pub fn new(pool: SqlitePool, cipher: Arc<dyn CredentialCipher>) -> Self {
        Self { pool, cipher }
    }

    fn to_item(&self, row: ItemRow) -> Result<Item> {
        let token = self.cipher.open(&row.access_token)?;

        Ok(Item {
            id: ItemId::from_string(&row.id)?,
            family_id: FamilyId::from_string(&row.family_id)?,
            provider_item_id: row.provider_item_id,
            name: row.name,
            access_token: AccessToken::new(token),
            next_cursor: row.next_cursor,
            last_synced_at: timestamp_to_datetime(row.last_synced_at),
            available_products: ProductSet::from_json(&row.available_products)?,
            billed_products: ProductSet::from_json(&row.billed_products)?,
            scheduled_for_deletion: row.scheduled_for_deletion,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn to_items(&self, rows: Vec<ItemRow>) -> Result<Vec<Item>> {
        rows.into_iter().map(|row| self.to_item(row)).collect()
    }

    fn ensure_updated(id: &ItemId, rows_affected: u64) -> Result<()> {
        if rows_affected == 0 {
            return Err(LedgerError::not_found("item", id));
        }
        Ok(())
    }
}

/// Database row representation of an item
#[derive(Debug, FromRow)]
struct ItemRow {
    id: String,
    family_id: String,
    provider_item_id: String,
    name: String,
    access_token: String,
    next_cursor: Option<String>,
    last_synced_at: Option<i64>,
    available_products: String,
    billed_products: String,
    scheduled_for_deletion: bool,
    created_at: i64,
    updated_at: i64,
}

const ITEM_COLUMNS: &str = "id, family_id, provider_item_id, name, access_token, next_cursor, \
     last_synced_at, available_products, billed_products, scheduled_for_deletion, \
     created_at, updated_at";

#[async_trait]
impl ItemRepository for SqliteItemRepository {
    async fn insert(&self, item: &Item) -> Result<()> {
        item.validate()?;
        let sealed = self.cipher.seal(item.access_token.expose())?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, family_id, provider_item_id, name, access_token, next_cursor,
                last_synced_at, available_products, billed_products,
                scheduled_for_deletion, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.as_str())
        .bind(item.family_id.as_str())
        .bind(&item.provider_item_id)
        .bind(&item.name)
        .bind(sealed)
        .bind(&item.next_cursor)
        .bind(item.last_synced_at.map(|at| at.timestamp()))
        .bind(item.available_products.to_json()?)
        .bind(item.billed_products.to_json()?)
        .bind(item.scheduled_for_deletion)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_id(&self, id: &ItemId) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE id = ?",
            ITEM_COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.to_item(row)).transpose()
    }

    async fn find_by_provider_item_id(&self, provider_item_id: &str) -> Result<Option<Item>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE provider_item_id = ?",
            ITEM_COLUMNS
        ))
        .bind(provider_item_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| self.to_item(row)).transpose()
    }

    async fn list_ordered(&self, family_id: &FamilyId) -> Result<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE family_id = ? ORDER BY created_at DESC, rowid DESC",
            ITEM_COLUMNS
        ))
        .bind(family_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        self.to_items(rows)
    }

    async fn list_active(&self, family_id: &FamilyId) -> Result<Vec<Item>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items \
             WHERE family_id = ? AND scheduled_for_deletion = 0 \
             ORDER BY created_at DESC, rowid DESC",
            ITEM_COLUMNS
        ))
        .bind(family_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        self.to_items(rows)
    }

    async fn touch_last_synced(&self, id: &ItemId, at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE items SET last_synced_at = ?, updated_at = ? WHERE id = ?")
            .bind(at.timestamp())
            .bind(at.timestamp())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Self::ensure_updated(id, result.rows_affected())
    }

    async fn update_products(
        &self,
        id: &ItemId,
        available: &ProductSet,
        billed: &ProductSet,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE items SET
                available_products = ?,
                billed_products = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(available.to_json()?)
        .bind(billed.to_json()?)
        .bind(at.timestamp())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(id, result.rows_affected())
    }

    async fn mark_scheduled_for_deletion(&self, id: &ItemId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE items SET scheduled_for_deletion = 1, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now().timestamp())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(id, result.rows_affected())
    }

    async fn delete(&self, id: &ItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

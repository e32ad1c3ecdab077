//! Item writes that join a sync scope

use crate::error::{LedgerError, Result};
use crate::models::ItemId;
use sqlx::SqliteConnection;

/// Replace the incremental transactions cursor.
pub async fn set_next_cursor(
    conn: &mut SqliteConnection,
    id: &ItemId,
    cursor: &str,
    now: i64,
) -> Result<()> {
    let result = sqlx::query("UPDATE items SET next_cursor = ?, updated_at = ? WHERE id = ?")
        .bind(cursor)
        .bind(now)
        .bind(id.as_str())
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(LedgerError::not_found("item", id));
    }
    Ok(())
}

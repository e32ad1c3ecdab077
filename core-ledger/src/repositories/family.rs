//! Family repository trait and implementation

use crate::error::Result;
use crate::models::{Family, FamilyId};
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn insert(&self, family: &Family) -> Result<()>;

    async fn find_by_id(&self, id: &FamilyId) -> Result<Option<Family>>;
}

/// SQLite implementation of FamilyRepository
pub struct SqliteFamilyRepository {
    pool: SqlitePool,
}

impl SqliteFamilyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct FamilyRow {
    id: String,
    name: String,
    created_at: i64,
}

#[async_trait]
impl FamilyRepository for SqliteFamilyRepository {
    async fn insert(&self, family: &Family) -> Result<()> {
        sqlx::query("INSERT INTO families (id, name, created_at) VALUES (?, ?, ?)")
            .bind(family.id.as_str())
            .bind(&family.name)
            .bind(family.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &FamilyId) -> Result<Option<Family>> {
        let row = sqlx::query_as::<_, FamilyRow>(
            "SELECT id, name, created_at FROM families WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(Family {
                id: FamilyId::from_string(&row.id)?,
                name: row.name,
                created_at: row.created_at,
            })
        })
        .transpose()
    }
}

//! Atomic write scope for one sync category
//!
//! Wraps a SQLite transaction. Everything a category writes for every
//! account of an item goes through [`AtomicScope::conn`]; the scope is then
//! either committed as a whole or rolled back as a whole.

use crate::error::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, warn};

pub struct AtomicScope {
    label: &'static str,
    tx: Transaction<'static, Sqlite>,
}

impl AtomicScope {
    /// Open a scope on a pooled connection.
    ///
    /// The connection stays checked out until the scope ends. Callers must
    /// not touch the pool again while holding a scope.
    pub async fn begin(pool: &SqlitePool, label: &'static str) -> Result<Self> {
        let tx = pool.begin().await?;
        debug!(scope = label, "Atomic scope opened");
        Ok(Self { label, tx })
    }

    /// Connection bound to the open transaction.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        debug!(scope = self.label, "Atomic scope committed");
        Ok(())
    }

    pub async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        warn!(scope = self.label, "Atomic scope rolled back");
        Ok(())
    }

    /// Commit on `Ok`, roll back on `Err` and hand the original error back.
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let label = self.label;
                if let Err(rollback_err) = self.rollback().await {
                    warn!(scope = label, error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

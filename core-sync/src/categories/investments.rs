//! Investments
//!
//! The provider returns a full snapshot. Securities referenced by an
//! account's records go into the shared catalog, holdings are replaced by
//! the snapshot and investment transactions are upserted by provider id.

use super::CategoryStats;
use crate::error::Result;
use bridge_traits::provider::{
    for_account, InvestmentsSnapshot, ProviderHolding, ProviderInvestmentTransaction,
    ProviderSecurity,
};
use core_ledger::stores::investments;
use core_ledger::Account;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::warn;

pub async fn apply_snapshot(
    conn: &mut SqliteConnection,
    accounts: &[Account],
    snapshot: &InvestmentsSnapshot,
    now: i64,
) -> Result<CategoryStats> {
    let mut stats = CategoryStats::default();

    for account in accounts {
        let id = account.provider_account_id.as_str();
        stats += apply_account(
            conn,
            account,
            &for_account(&snapshot.transactions, id),
            &for_account(&snapshot.holdings, id),
            &snapshot.securities,
            now,
        )
        .await?;
    }

    Ok(stats)
}

/// Apply one account's holdings and transactions against the full
/// securities list.
pub async fn apply_account(
    conn: &mut SqliteConnection,
    account: &Account,
    transactions: &[ProviderInvestmentTransaction],
    holdings: &[ProviderHolding],
    securities: &[ProviderSecurity],
    now: i64,
) -> Result<CategoryStats> {
    let mut stats = CategoryStats::default();
    let mut catalog = SecurityCatalog::new(securities, now);

    let mut kept = Vec::with_capacity(holdings.len());
    for holding in holdings {
        match catalog.resolve(conn, &holding.security_id).await? {
            Some(security_id) => {
                investments::upsert_holding(conn, &account.id, &security_id, holding, now).await?;
                kept.push(security_id);
                stats.upserted += 1;
            }
            None => {
                warn!(
                    account_id = %account.id,
                    security_id = %holding.security_id,
                    "Holding references unknown security, skipping"
                );
                stats.skipped += 1;
            }
        }
    }
    stats.removed += investments::delete_holdings_except(conn, &account.id, &kept).await? as usize;

    for data in transactions {
        let security_id = match data.security_id.as_deref() {
            Some(provider_id) => catalog.resolve(conn, provider_id).await?,
            None => None,
        };
        investments::upsert_investment_transaction(
            conn,
            &account.id,
            security_id.as_deref(),
            data,
            now,
        )
        .await?;
        stats.upserted += 1;
    }

    Ok(stats)
}

/// Provider securities, upserted into the catalog on first reference.
struct SecurityCatalog<'a> {
    snapshot: HashMap<&'a str, &'a ProviderSecurity>,
    local_ids: HashMap<String, String>,
    now: i64,
}

impl<'a> SecurityCatalog<'a> {
    fn new(securities: &'a [ProviderSecurity], now: i64) -> Self {
        Self {
            snapshot: securities
                .iter()
                .map(|security| (security.security_id.as_str(), security))
                .collect(),
            local_ids: HashMap::new(),
            now,
        }
    }

    /// Local id of a provider security, or `None` if the snapshot lacks it.
    async fn resolve(
        &mut self,
        conn: &mut SqliteConnection,
        provider_security_id: &str,
    ) -> Result<Option<String>> {
        if let Some(local) = self.local_ids.get(provider_security_id) {
            return Ok(Some(local.clone()));
        }
        let Some(data) = self.snapshot.get(provider_security_id).copied() else {
            return Ok(None);
        };
        let local = investments::upsert_security(conn, data, self.now).await?;
        self.local_ids
            .insert(provider_security_id.to_string(), local.clone());
        Ok(Some(local))
    }
}

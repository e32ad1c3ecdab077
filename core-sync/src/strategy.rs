//! Category strategy table
//!
//! One entry per provider data category. Each entry knows the provider
//! method it calls, whether an item is eligible for it, how to fetch its
//! payload and which category module applies that payload.

use crate::categories::{self, CategoryStats};
use crate::error::Result;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::provider::{
    AggregationProvider, InvestmentsSnapshot, ItemHandle, LiabilitiesSnapshot, TransactionsDelta,
};
use core_ledger::{Account, Item};
use serde::Serialize;
use sqlx::SqliteConnection;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCategory {
    Transactions,
    Investments,
    Liabilities,
}

impl SyncCategory {
    /// Categories in the order an item sync runs them.
    pub const ALL: [SyncCategory; 3] = [
        SyncCategory::Transactions,
        SyncCategory::Investments,
        SyncCategory::Liabilities,
    ];

    /// Provider method backing this category; used in logs.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Transactions => "get_item_transactions",
            Self::Investments => "get_item_investments",
            Self::Liabilities => "get_item_liabilities",
        }
    }

    /// Investment-capable items report cash activity as investment
    /// transactions, so they skip the transactions category.
    pub fn is_eligible(self, item: &Item) -> bool {
        match self {
            Self::Transactions => !item.has_investment_accounts(),
            Self::Investments => item.has_investment_accounts(),
            Self::Liabilities => item.has_liability_accounts(),
        }
    }

    pub async fn fetch(
        self,
        provider: &dyn AggregationProvider,
        handle: &ItemHandle,
    ) -> BridgeResult<CategoryPayload> {
        Ok(match self {
            Self::Transactions => {
                CategoryPayload::Transactions(provider.get_item_transactions(handle).await?)
            }
            Self::Investments => {
                CategoryPayload::Investments(provider.get_item_investments(handle).await?)
            }
            Self::Liabilities => {
                CategoryPayload::Liabilities(provider.get_item_liabilities(handle).await?)
            }
        })
    }
}

impl fmt::Display for SyncCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Transactions => "transactions",
            Self::Investments => "investments",
            Self::Liabilities => "liabilities",
        };
        f.write_str(name)
    }
}

/// Data fetched for one category.
#[derive(Debug, Clone)]
pub enum CategoryPayload {
    Transactions(TransactionsDelta),
    Investments(InvestmentsSnapshot),
    Liabilities(LiabilitiesSnapshot),
}

impl CategoryPayload {
    pub fn category(&self) -> SyncCategory {
        match self {
            Self::Transactions(_) => SyncCategory::Transactions,
            Self::Investments(_) => SyncCategory::Investments,
            Self::Liabilities(_) => SyncCategory::Liabilities,
        }
    }

    /// Write the payload for `accounts` through `conn`, stamping rows with
    /// `now` (unix seconds).
    pub async fn apply(
        &self,
        conn: &mut SqliteConnection,
        item: &Item,
        accounts: &[Account],
        now: i64,
    ) -> Result<CategoryStats> {
        match self {
            Self::Transactions(delta) => {
                categories::transactions::apply_delta(conn, item, accounts, delta, now).await
            }
            Self::Investments(snapshot) => {
                categories::investments::apply_snapshot(conn, accounts, snapshot, now).await
            }
            Self::Liabilities(snapshot) => {
                categories::liabilities::apply_snapshot(conn, accounts, snapshot, now).await
            }
        }
    }
}

/// What happened to one category during an item sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryOutcome {
    pub category: SyncCategory,
    pub status: CategoryStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CategoryStatus {
    /// Item not eligible for the category
    Skipped,
    /// Provider API refused the fetch; nothing was written
    Unavailable,
    /// Payload written and committed
    Applied(CategoryStats),
}

//! # Ledger Module
//!
//! Owns the local financial ledger database: linked items, their accounts
//! and the per-category records synced from the aggregation provider.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repositories for families, items and accounts
//! - Connection-scoped stores for transactions, investments and liabilities
//! - Sealing access tokens at rest through a [`bridge_traits::storage::CredentialCipher`]

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod stores;

#[cfg(test)]
pub(crate) mod test_support;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LedgerError, Result};
pub use models::{
    Account, AccountId, CreditDetail, Family, FamilyId, Holding, InvestmentTransaction, Item,
    ItemId, MortgageDetail, ProductSet, Security, StudentLoanDetail, Transaction,
};
pub use repositories::{
    AccountRepository, FamilyRepository, ItemRepository, SqliteAccountRepository,
    SqliteFamilyRepository, SqliteItemRepository,
};

//! # Connection-scoped stores
//!
//! Writers used while a sync category's SQLite transaction is open. Every
//! writer takes a `&mut SqliteConnection` so the caller decides the
//! transaction boundary; readers accept any executor (pool or connection).
//!
//! - [`items`] - Item columns that change inside a sync scope (cursor)
//! - [`transactions`] - Cash transactions per account
//! - [`investments`] - Securities catalog, holdings and investment transactions
//! - [`liabilities`] - Credit, mortgage and student loan details

pub mod investments;
pub mod items;
pub mod liabilities;
pub mod transactions;

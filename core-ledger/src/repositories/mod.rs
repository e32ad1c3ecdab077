//! # Repository Pattern Implementation
//!
//! Repository traits and SQLite implementations for the entities that live
//! outside a sync scope: families, items and accounts.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//!
//! Writes that must join a sync category's transaction live in
//! [`crate::stores`] instead and take a `&mut SqliteConnection`.
//!
//! ## Available Repositories
//!
//! - `FamilyRepository` - Owner scope for items and accounts
//! - `ItemRepository` - Linked provider credentials and their sync state
//! - `AccountRepository` - Accounts reported under an item

pub mod account;
pub mod family;
pub mod item;

pub use account::{AccountRepository, SqliteAccountRepository};
pub use family::{FamilyRepository, SqliteFamilyRepository};
pub use item::{ItemRepository, SqliteItemRepository};

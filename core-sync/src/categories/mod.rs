//! # Category sync modules
//!
//! Each module applies one provider data category to the ledger for a set of
//! reconciled accounts. Every write goes through the connection of the
//! caller's [`AtomicScope`](crate::scope::AtomicScope).
//!
//! - [`transactions`] - Cash transaction deltas and the item cursor
//! - [`investments`] - Securities, holdings and investment transactions
//! - [`liabilities`] - Credit, mortgage and student loan details

pub mod investments;
pub mod liabilities;
pub mod transactions;

use serde::Serialize;
use std::ops::AddAssign;

/// Write counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    /// Records inserted or overwritten
    pub upserted: usize,
    /// Records deleted
    pub removed: usize,
    /// Records ignored because they could not be linked
    pub skipped: usize,
}

impl AddAssign for CategoryStats {
    fn add_assign(&mut self, other: Self) {
        self.upserted += other.upserted;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }
}

//! Per-item sync lock
//!
//! Two syncs of the same item must not interleave: they would race on the
//! cursor and on the account snapshot. Syncs of different items are
//! independent.

use core_ledger::ItemId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Registry of items with a sync in flight.
#[derive(Debug, Clone, Default)]
pub struct SyncLockRegistry {
    active: Arc<Mutex<HashSet<ItemId>>>,
}

impl SyncLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the item, or `None` when another sync already holds it.
    pub fn try_acquire(&self, item_id: ItemId) -> Option<SyncGuard> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(item_id) {
            return None;
        }
        Some(SyncGuard {
            item_id,
            active: Arc::clone(&self.active),
        })
    }

    pub fn is_locked(&self, item_id: &ItemId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(item_id)
    }
}

/// Releases the item when dropped.
#[derive(Debug)]
pub struct SyncGuard {
    item_id: ItemId,
    active: Arc<Mutex<HashSet<ItemId>>>,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&self.item_id);
    }
}

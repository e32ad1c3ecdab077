//! # Item Lifecycle
//!
//! Creation of items from a provider public token, deferred deletion and
//! final removal with credential revocation.

use crate::error::{Result, SyncError};
use crate::syncable::Syncable;
use bridge_traits::background::{BackgroundJob, JobId, JobScheduler};
use bridge_traits::provider::AggregationProvider;
use core_ledger::{FamilyId, Item, ItemId, ItemRepository};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct ItemLifecycle {
    items: Arc<dyn ItemRepository>,
    provider: Arc<dyn AggregationProvider>,
    scheduler: Arc<dyn JobScheduler>,
    strict_revocation: bool,
}

impl ItemLifecycle {
    pub fn new(
        items: Arc<dyn ItemRepository>,
        provider: Arc<dyn AggregationProvider>,
        scheduler: Arc<dyn JobScheduler>,
    ) -> Self {
        Self {
            items,
            provider,
            scheduler,
            strict_revocation: false,
        }
    }

    /// Refuse to delete an item whose credential could not be revoked.
    pub fn with_strict_revocation(mut self, strict: bool) -> Self {
        self.strict_revocation = strict;
        self
    }

    /// Exchange `public_token`, persist the new item and queue its first
    /// sync.
    ///
    /// # Errors
    ///
    /// - `CredentialExchange` if the provider rejects the token
    /// - `Validation` if the name or the returned credential is blank
    /// - `Ledger` if the item cannot be stored
    /// - `Scheduler` if the initial sync cannot be queued
    #[instrument(skip(self, public_token), fields(family_id = %family_id))]
    pub async fn create_from_public_token(
        &self,
        family_id: FamilyId,
        public_token: &str,
        name: &str,
    ) -> Result<Item> {
        let exchange = self
            .provider
            .exchange_public_token(public_token)
            .await
            .map_err(SyncError::CredentialExchange)?;

        let item = Item::new(family_id, exchange.item_id, name.trim(), exchange.access_token)
            .map_err(SyncError::from_ledger_input)?;

        self.items.insert(&item).await?;
        info!(item_id = %item.id, "Item linked");

        item.sync_later(self.scheduler.as_ref(), None).await?;

        Ok(item)
    }

    /// Flag the item and queue its destruction.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn schedule_deletion(&self, item_id: ItemId) -> Result<JobId> {
        self.require(&item_id).await?;
        self.items.mark_scheduled_for_deletion(&item_id).await?;

        self.scheduler
            .enqueue(BackgroundJob::DestroyItem {
                item_id: item_id.as_str(),
            })
            .await
            .map_err(SyncError::Scheduler)
    }

    /// Revoke the item's credential and delete it with everything it owns.
    ///
    /// A failed revocation is logged and the local delete proceeds, unless
    /// strict revocation is enabled.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove(&self, item_id: ItemId) -> Result<()> {
        let item = self.require(&item_id).await?;

        if let Err(error) = self.provider.remove_item(&item.access_token).await {
            warn!(item_id = %item.id, error = %error, "Failed to revoke item credential");
            if self.strict_revocation {
                return Err(SyncError::provider("remove_item", error));
            }
        }

        self.items.delete(&item.id).await?;
        info!("Item removed");
        Ok(())
    }

    async fn require(&self, item_id: &ItemId) -> Result<Item> {
        self.items
            .find_by_id(item_id)
            .await?
            .ok_or_else(|| SyncError::ItemNotFound {
                item_id: item_id.to_string(),
            })
    }
}

//! Seller-facing catalog operations and standalone stock reservation

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::finish;
use crate::domain::aggregates::{NewProduct, Product, ProductUpdate};
use crate::domain::identity::Actor;
use crate::infrastructure::{EventPublisher, MarketplaceStore, UnitOfWork};
use crate::{MarketplaceError, Result};

/// Stock counters after a successful reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub product_id: Uuid,
    pub reserved_quantity: u32,
    pub available_quantity: u32,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn MarketplaceStore>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(store: Arc<dyn MarketplaceStore>, events: EventPublisher) -> Self {
        Self { store, events }
    }

    pub async fn create_product(&self, actor: &Actor, new: NewProduct) -> Result<Product> {
        if !actor.is_seller() {
            return Err(MarketplaceError::access_denied("only sellers can list products"));
        }
        let mut product = Product::create(actor.id, new)?;
        let mut tx = self.store.begin().await?;
        let result = tx.insert_product(&product).await.map_err(MarketplaceError::from);
        finish(tx, result).await?;

        tracing::info!(product_id = %product.id(), seller_id = %actor.id, quantity = product.quantity(), "Product created");
        self.events.publish(product.take_events()).await;
        Ok(product)
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product> {
        self.store
            .find_product(product_id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or(MarketplaceError::ProductNotFound(product_id))
    }

    pub async fn update_product(&self, actor: &Actor, product_id: Uuid, update: ProductUpdate) -> Result<Product> {
        let mut tx = self.store.begin().await?;
        let result: Result<Product> = async {
            let mut product = owned_product(&mut *tx, actor, product_id).await?;
            product.apply_update(update)?;
            tx.save_product(&product).await?;
            Ok(product)
        }
        .await;
        let mut product = finish(tx, result).await?;

        tracing::info!(product_id = %product_id, actor_id = %actor.id, "Product updated");
        self.events.publish(product.take_events()).await;
        Ok(product)
    }

    pub async fn delete_product(&self, actor: &Actor, product_id: Uuid) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let result: Result<Product> = async {
            let mut product = owned_product(&mut *tx, actor, product_id).await?;
            product.soft_delete();
            tx.save_product(&product).await?;
            Ok(product)
        }
        .await;
        let mut product = finish(tx, result).await?;

        tracing::info!(product_id = %product_id, actor_id = %actor.id, "Product deleted");
        self.events.publish(product.take_events()).await;
        Ok(())
    }

    /// Holds stock outside of an order, e.g. for a checkout hold.
    pub async fn reserve(&self, actor: &Actor, product_id: Uuid, quantity: u32) -> Result<Reservation> {
        if quantity == 0 {
            return Err(MarketplaceError::Validation("quantity must be at least 1".into()));
        }
        let mut tx = self.store.begin().await?;
        let result: Result<Product> = async {
            let mut product = tx
                .lock_product(product_id)
                .await?
                .filter(|p| !p.is_deleted())
                .ok_or(MarketplaceError::ProductNotFound(product_id))?;
            if !product.reserve_inventory(quantity) {
                return Err(MarketplaceError::InsufficientInventory {
                    product_id,
                    requested: quantity,
                    available: product.available_quantity(),
                });
            }
            tx.save_product(&product).await?;
            Ok(product)
        }
        .await;
        let mut product = finish(tx, result).await?;

        tracing::info!(product_id = %product_id, actor_id = %actor.id, quantity, "Inventory reserved");
        self.events.publish(product.take_events()).await;
        Ok(Reservation {
            product_id,
            reserved_quantity: product.reserved_quantity(),
            available_quantity: product.available_quantity(),
        })
    }
}

async fn owned_product(uow: &mut dyn UnitOfWork, actor: &Actor, product_id: Uuid) -> Result<Product> {
    let product = uow
        .lock_product(product_id)
        .await?
        .filter(|p| !p.is_deleted())
        .ok_or(MarketplaceError::ProductNotFound(product_id))?;
    if !actor.is_admin() && product.seller_id() != actor.id {
        return Err(MarketplaceError::access_denied("product belongs to another seller"));
    }
    Ok(product)
}

//! Order workflow: placement, status changes, cancellation and payment.
//!
//! Each operation runs in one unit of work. Stock reservations and releases
//! made on the way are committed together with the order, or not at all.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::finish;
use crate::config::OrderPolicy;
use crate::domain::aggregates::{
    loyalty_points_for, CustomerProfile, CustomizationSelection, DiscountLine, ItemStatus, LineItem, NewOrder, Order,
    OrderStatus, PaymentMethod, PaymentStatus, PaymentUpdate, Product, ShippingMethod,
};
use crate::domain::events::DomainEvent;
use crate::domain::identity::{Actor, ActorRole};
use crate::domain::value_objects::{Address, OrderNumber};
use crate::infrastructure::{EventPublisher, MarketplaceStore, Page, UnitOfWork};
use crate::{MarketplaceError, Result};

#[derive(Clone, Debug)]
pub struct OrderLineRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub customization: Vec<CustomizationSelection>,
}

#[derive(Clone, Debug)]
pub struct PlaceOrder {
    pub items: Vec<OrderLineRequest>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub shipping_method: ShippingMethod,
    pub discounts: Vec<DiscountLine>,
    pub notes: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTarget {
    Order(OrderStatus),
    Item { item_id: Uuid, status: ItemStatus },
}

#[derive(Clone, Debug)]
pub struct StatusUpdate {
    pub target: StatusTarget,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn MarketplaceStore>,
    events: EventPublisher,
    policy: OrderPolicy,
}

impl OrderService {
    pub fn new(store: Arc<dyn MarketplaceStore>, events: EventPublisher, policy: OrderPolicy) -> Self {
        Self { store, events, policy }
    }

    pub async fn create_order(&self, actor: &Actor, cmd: PlaceOrder) -> Result<Order> {
        if cmd.items.is_empty() {
            return Err(MarketplaceError::Validation("an order needs at least one item".into()));
        }
        if let Some(line) = cmd.items.iter().find(|l| l.quantity == 0) {
            return Err(MarketplaceError::Validation(format!("quantity for product {} must be at least 1", line.product_id)));
        }
        if cmd.discounts.iter().any(|d| d.amount.is_sign_negative() && !d.amount.is_zero()) {
            return Err(MarketplaceError::Validation("discount amounts cannot be negative".into()));
        }

        let mut tx = self.store.begin().await?;
        let result = self.place(&mut *tx, actor, cmd).await;
        let (order, events) = finish(tx, result).await.map_err(|e| {
            tracing::warn!(buyer_id = %actor.id, code = e.code(), error = %e, "Order placement rolled back");
            e
        })?;

        tracing::info!(
            order_id = %order.id(),
            order_number = %order.order_number(),
            total = %order.total(),
            items = order.items().len(),
            "Order placed"
        );
        self.events.publish(events).await;
        Ok(order)
    }

    async fn place(&self, uow: &mut dyn UnitOfWork, actor: &Actor, cmd: PlaceOrder) -> Result<(Order, Vec<DomainEvent>)> {
        let mut lines = Vec::with_capacity(cmd.items.len());
        let mut events = Vec::new();

        let mut products = lock_products(uow, cmd.items.iter().map(|l| l.product_id)).await?;
        for line in cmd.items {
            let product = products
                .get_mut(&line.product_id)
                .filter(|p| !p.is_deleted())
                .ok_or(MarketplaceError::ProductNotFound(line.product_id))?;
            if !product.is_in_stock(line.quantity) {
                return Err(MarketplaceError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: product.available_quantity(),
                });
            }
            if !product.reserve_inventory(line.quantity) {
                return Err(MarketplaceError::ReservationFailed(line.product_id));
            }
            lines.push(LineItem::from_product(product, line.quantity, line.customization));
        }
        for product in products.values_mut() {
            uow.save_product(product).await?;
            events.extend(product.take_events());
        }

        let today = Utc::now().date_naive();
        let sequence = uow.next_order_sequence(today).await?;
        let mut order = Order::place(NewOrder {
            order_number: OrderNumber::new(&self.policy.order_number_prefix, today, sequence),
            buyer_id: actor.id,
            items: lines,
            shipping_method: cmd.shipping_method,
            shipping_address: cmd.shipping_address,
            billing_address: cmd.billing_address,
            payment_method: cmd.payment_method,
            discounts: cmd.discounts,
            notes: cmd.notes,
            tax_rate: self.policy.tax_rate,
        })?;
        uow.insert_order(&order).await?;

        let points = loyalty_points_for(order.total());
        if points > 0 {
            uow.credit_loyalty_points(order.buyer_id(), points).await?;
        }
        events.extend(order.take_events());
        Ok((order, events))
    }

    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        let order = self.store.find_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        let visible = actor.is_admin() || order.buyer_id() == actor.id || (actor.is_seller() && order.involves_seller(actor.id));
        if !visible {
            return Err(MarketplaceError::access_denied("order belongs to another account"));
        }
        Ok(order)
    }

    pub async fn list_orders(&self, actor: &Actor, page: Page) -> Result<Vec<Order>> {
        Ok(self.store.list_orders(actor, page).await?)
    }

    pub async fn update_status(&self, actor: &Actor, order_id: Uuid, update: StatusUpdate) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = Self::apply_status(&mut *tx, actor, order_id, update).await;
        let mut order = finish(tx, result).await?;
        tracing::info!(order_id = %order_id, status = %order.status(), actor_id = %actor.id, "Order status updated");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    async fn apply_status(uow: &mut dyn UnitOfWork, actor: &Actor, order_id: Uuid, update: StatusUpdate) -> Result<Order> {
        let mut order = uow.lock_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        match update.target {
            StatusTarget::Item { item_id, status } => {
                if actor.role.actor_role() == ActorRole::Buyer {
                    return Err(MarketplaceError::access_denied("only sellers update line items"));
                }
                let promoted = order.update_item_status(actor.actor_ref(), item_id, status, update.note)?;
                if promoted {
                    tracing::info!(order_id = %order_id, seller_id = %actor.id, "Seller items ready, order promoted");
                }
            }
            StatusTarget::Order(status) => {
                if actor.is_seller() {
                    return Err(MarketplaceError::access_denied("sellers update their own line items"));
                }
                ensure_buyer_or_admin(actor, &order)?;
                order.update_status(actor.actor_ref(), status, update.note)?;
            }
        }
        uow.save_order(&order).await?;
        Ok(order)
    }

    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid, reason: Option<String>) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = Self::apply_cancel(&mut *tx, actor, order_id, reason).await;
        let (mut order, mut events) = finish(tx, result).await?;
        tracing::info!(order_id = %order_id, actor_id = %actor.id, "Order cancelled, inventory returned");
        events.extend(order.take_events());
        self.events.publish(events).await;
        Ok(order)
    }

    async fn apply_cancel(uow: &mut dyn UnitOfWork, actor: &Actor, order_id: Uuid, reason: Option<String>) -> Result<(Order, Vec<DomainEvent>)> {
        let mut order = uow.lock_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        ensure_buyer_or_admin(actor, &order)?;
        // Paid orders no longer hold reservations; their units were sold.
        let sold = order.is_paid();
        order.cancel(actor.actor_ref(), reason)?;

        let mut events = Vec::new();
        let mut products = lock_products(uow, order.items().iter().map(|i| i.product_id)).await?;
        for item in order.items() {
            let Some(product) = products.get_mut(&item.product_id) else {
                tracing::warn!(order_id = %order_id, product_id = %item.product_id, "Product missing while returning stock");
                continue;
            };
            if sold {
                product.restock(item.quantity, &item.total_price)?;
            } else {
                product.release_reserved_inventory(item.quantity);
            }
        }
        for product in products.values_mut() {
            uow.save_product(product).await?;
            events.extend(product.take_events());
        }
        uow.save_order(&order).await?;
        Ok((order, events))
    }

    pub async fn update_payment(&self, actor: &Actor, order_id: Uuid, update: PaymentUpdate) -> Result<Order> {
        let mut tx = self.store.begin().await?;
        let result = Self::apply_payment(&mut *tx, actor, order_id, update).await;
        let (mut order, mut events) = finish(tx, result).await?;
        tracing::info!(order_id = %order_id, payment_status = %order.payment().status, "Payment status updated");
        events.extend(order.take_events());
        self.events.publish(events).await;
        Ok(order)
    }

    async fn apply_payment(uow: &mut dyn UnitOfWork, actor: &Actor, order_id: Uuid, update: PaymentUpdate) -> Result<(Order, Vec<DomainEvent>)> {
        let mut order = uow.lock_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        ensure_buyer_or_admin(actor, &order)?;
        let status = order.record_payment(actor.actor_ref(), update)?;

        let mut events = Vec::new();
        if matches!(status, PaymentStatus::Completed | PaymentStatus::Failed) {
            let mut products = lock_products(uow, order.items().iter().map(|i| i.product_id)).await?;
            for item in order.items() {
                let Some(product) = products.get_mut(&item.product_id) else {
                    tracing::warn!(order_id = %order_id, product_id = %item.product_id, "Product missing while settling payment");
                    continue;
                };
                if status == PaymentStatus::Completed {
                    product.complete_sale(item.quantity, &item.total_price)?;
                } else {
                    product.release_reserved_inventory(item.quantity);
                }
            }
            for product in products.values_mut() {
                uow.save_product(product).await?;
                events.extend(product.take_events());
            }
        }
        if status == PaymentStatus::Completed {
            uow.record_purchase(order.buyer_id(), order.total().amount(), Utc::now()).await?;
        }
        uow.save_order(&order).await?;
        Ok((order, events))
    }

    pub async fn customer_profile(&self, actor: &Actor, customer_id: Uuid) -> Result<CustomerProfile> {
        if !actor.is_admin() && actor.id != customer_id {
            return Err(MarketplaceError::access_denied("profile belongs to another account"));
        }
        let profile = self.store.find_customer_profile(customer_id).await?;
        Ok(profile.unwrap_or_else(|| CustomerProfile::new(customer_id)))
    }
}

/// Locks each distinct product once, in ascending id order. Missing ids are
/// left out of the map.
async fn lock_products(uow: &mut dyn UnitOfWork, ids: impl Iterator<Item = Uuid>) -> Result<BTreeMap<Uuid, Product>> {
    let ids: BTreeSet<Uuid> = ids.collect();
    let mut products = BTreeMap::new();
    for id in ids {
        if let Some(product) = uow.lock_product(id).await? {
            products.insert(id, product);
        }
    }
    Ok(products)
}

fn ensure_buyer_or_admin(actor: &Actor, order: &Order) -> Result<()> {
    if actor.is_admin() || (actor.role.actor_role() == ActorRole::Buyer && order.buyer_id() == actor.id) {
        return Ok(());
    }
    Err(MarketplaceError::access_denied("order belongs to another account"))
}

//! Order Aggregate
//!
//! Owns its line items and status timeline. Pricing is computed once at
//! placement from the line-item snapshots and never recalculated, so
//! `total = subtotal + shipping + tax - discount` and
//! `subtotal = sum(item totals)` hold for the life of the order.
//! The timeline only ever grows.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::product::Product;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::identity::{ActorRef, ActorRole};
use crate::domain::value_objects::{Address, LeadTime, Money, MoneyError, OrderNumber};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    buyer_id: Uuid,
    status: OrderStatus,
    items: Vec<LineItem>,
    pricing: Pricing,
    discounts: Vec<DiscountLine>,
    shipping_method: ShippingMethod,
    shipping_address: Address,
    billing_address: Address,
    payment: Payment,
    notes: Option<String>,
    estimated_completion: DateTime<Utc>,
    actual_completion: Option<DateTime<Utc>>,
    cancellation: Option<Cancellation>,
    timeline: Vec<TimelineEntry>,
    ordered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub customization: Vec<CustomizationSelection>,
    pub customization_cost: Money,
    pub total_price: Money,
    pub crafting_days: i64,
    pub status: ItemStatus,
    /// Note left with the latest item status change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationSelection {
    pub option: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub subtotal: Money,
    pub shipping_cost: Money,
    pub tax_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountLine {
    pub code: Option<String>,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub cancelled_by: ActorRef,
    pub cancelled_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub refund_status: RefundStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub status: OrderStatus,
    pub note: Option<String>,
    pub actor: ActorRef,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    PaymentProcessing,
    Paid,
    Confirmed,
    Processing,
    Ready,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
    PaymentFailed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus { #[default] Pending, Confirmed, Crafting, Ready, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Processing, Completed, Failed, Refunded }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Card, BankTransfer, MobileMoney, Paypal, CashOnDelivery }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod { #[default] Standard, Express, International }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus { #[default] Pending, Completed }

impl ShippingMethod {
    pub fn cost(&self, currency: &str) -> Money {
        let amount = match self {
            Self::Standard => 200,
            Self::Express => 500,
            Self::International => 2000,
        };
        Money::new(Decimal::from(amount), currency)
    }
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::PaymentProcessing => "payment_processing",
            Self::Paid => "paid",
            Self::Confirmed => "confirmed",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::PaymentFailed => "payment_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Refunded | Self::PaymentFailed)
    }

    // Position on the main fulfilment path; side branches have none.
    fn stage(&self) -> Option<u8> {
        match self {
            Self::PendingPayment => Some(0),
            Self::PaymentProcessing => Some(1),
            Self::Paid => Some(2),
            Self::Confirmed => Some(3),
            Self::Processing => Some(4),
            Self::Ready => Some(5),
            Self::Shipped => Some(6),
            Self::Delivered => Some(7),
            Self::Completed => Some(8),
            Self::Cancelled | Self::Refunded | Self::PaymentFailed => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| format!("unknown order status '{s}'"))
    }
}

impl FromStr for ItemStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|_| format!("unknown item status '{s}'"))
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

impl LineItem {
    /// Snapshots the product's current price and lead time for `quantity` units.
    /// Selected options the product does not offer add no surcharge.
    pub fn from_product(product: &Product, quantity: u32, customization: Vec<CustomizationSelection>) -> Self {
        let unit_price = product.effective_price().clone();
        let currency = unit_price.currency().to_string();
        let surcharge_per_unit: Decimal = customization.iter()
            .filter_map(|sel| product.customization_options().iter().find(|o| o.name == sel.option))
            .map(|o| o.additional_cost)
            .sum();
        let customization_cost = Money::new(surcharge_per_unit * Decimal::from(quantity), &currency);
        let total_price = Money::new(unit_price.multiply(quantity).amount() + customization_cost.amount(), &currency);
        let crafting_days = LeadTime::parse(product.crafting_time()).with_customization(!customization.is_empty()).days();
        Self {
            id: Uuid::now_v7(), product_id: product.id(), seller_id: product.seller_id(), name: product.name().to_string(),
            quantity, unit_price, customization, customization_cost, total_price, crafting_days, status: ItemStatus::Pending,
            note: None,
        }
    }

    pub fn is_customized(&self) -> bool { !self.customization.is_empty() }
}

impl Pricing {
    pub fn compute(items: &[LineItem], shipping: ShippingMethod, tax_rate: Decimal, discounts: &[DiscountLine]) -> Result<Self, OrderError> {
        let first = items.first().ok_or(OrderError::NoItems)?;
        let currency = first.total_price.currency().to_string();
        let subtotal = items.iter().try_fold(Money::zero(&currency), |acc, i| acc.add(&i.total_price))?;
        let shipping_cost = shipping.cost(&currency);
        let tax_amount = subtotal.scale(tax_rate);
        let discount_amount = Money::new(discounts.iter().map(|d| d.amount).sum(), &currency);
        let gross = subtotal.add(&shipping_cost)?.add(&tax_amount)?;
        if discount_amount.amount() > gross.amount() { return Err(OrderError::DiscountExceedsTotal); }
        let total_amount = gross.subtract(&discount_amount)?;
        Ok(Self { subtotal, shipping_cost, tax_amount, discount_amount, total_amount })
    }
}

/// Everything needed to place an order once stock has been reserved.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub buyer_id: Uuid,
    pub items: Vec<LineItem>,
    pub shipping_method: ShippingMethod,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: PaymentMethod,
    pub discounts: Vec<DiscountLine>,
    pub notes: Option<String>,
    pub tax_rate: Decimal,
}

impl Order {
    pub fn place(new: NewOrder) -> Result<Self, OrderError> {
        let pricing = Pricing::compute(&new.items, new.shipping_method, new.tax_rate, &new.discounts)?;
        let id = Uuid::now_v7();
        let now = Utc::now();
        // The order is ready only when its slowest item is.
        let crafting_days = new.items.iter().map(|i| i.crafting_days).max().unwrap_or(LeadTime::DEFAULT_DAYS);
        let estimated_completion = now
            .checked_add_signed(Duration::days(crafting_days))
            .unwrap_or_else(|| now + Duration::days(LeadTime::DEFAULT_DAYS));
        let buyer = ActorRef { id: new.buyer_id, role: ActorRole::Buyer };
        let mut order = Self {
            id, order_number: new.order_number, buyer_id: new.buyer_id, status: OrderStatus::PendingPayment,
            items: new.items, pricing, discounts: new.discounts, shipping_method: new.shipping_method,
            billing_address: new.billing_address.unwrap_or_else(|| new.shipping_address.clone()),
            shipping_address: new.shipping_address,
            payment: Payment { method: new.payment_method, status: PaymentStatus::Pending, transaction_id: None, details: None, paid_at: None },
            notes: new.notes, estimated_completion, actual_completion: None,
            cancellation: None, timeline: vec![], ordered_at: now, updated_at: now, events: vec![],
        };
        order.record(OrderStatus::PendingPayment, Some("Order placed".into()), buyer);
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id, order_number: order.order_number.to_string(), buyer_id: order.buyer_id, total: order.pricing.total_amount.amount(),
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn buyer_id(&self) -> Uuid { self.buyer_id }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn items(&self) -> &[LineItem] { &self.items }
    pub fn pricing(&self) -> &Pricing { &self.pricing }
    pub fn total(&self) -> &Money { &self.pricing.total_amount }
    pub fn payment(&self) -> &Payment { &self.payment }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn billing_address(&self) -> &Address { &self.billing_address }
    pub fn ordered_at(&self) -> DateTime<Utc> { self.ordered_at }
    pub fn estimated_completion(&self) -> DateTime<Utc> { self.estimated_completion }
    pub fn actual_completion(&self) -> Option<DateTime<Utc>> { self.actual_completion }
    pub fn cancellation(&self) -> Option<&Cancellation> { self.cancellation.as_ref() }
    pub fn timeline(&self) -> &[TimelineEntry] { &self.timeline }

    pub fn seller_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.items.iter().map(|i| i.seller_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn involves_seller(&self, seller_id: Uuid) -> bool { self.items.iter().any(|i| i.seller_id == seller_id) }

    pub fn is_paid(&self) -> bool { matches!(self.payment.status, PaymentStatus::Completed | PaymentStatus::Refunded) }

    pub fn can_be_cancelled(&self) -> bool {
        !matches!(self.status,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Completed |
            OrderStatus::Cancelled | OrderStatus::Refunded | OrderStatus::PaymentFailed)
    }

    /// Sets the overall status on behalf of a buyer or admin.
    ///
    /// `paid` and later stages need a completed payment, so stock held for the
    /// order is always settled through `record_payment`. Cash on delivery
    /// orders may ship and be delivered first but still cannot complete unpaid.
    pub fn update_status(&mut self, actor: ActorRef, status: OrderStatus, note: Option<String>) -> Result<(), OrderError> {
        if self.status.is_terminal() || matches!(status, OrderStatus::Cancelled | OrderStatus::Refunded | OrderStatus::PaymentFailed) {
            return Err(OrderError::InvalidTransition { from: self.status, to: status });
        }
        let needs_payment = match status {
            OrderStatus::Paid | OrderStatus::Completed => true,
            other => other.stage().is_some_and(|s| s >= 2) && self.payment.method != PaymentMethod::CashOnDelivery,
        };
        if needs_payment && self.payment.status != PaymentStatus::Completed {
            return Err(OrderError::AwaitingPayment(status));
        }
        self.status = status;
        if matches!(status, OrderStatus::Delivered | OrderStatus::Completed) && self.actual_completion.is_none() {
            self.actual_completion = Some(Utc::now());
        }
        self.record(status, note, actor);
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status }));
        Ok(())
    }

    /// Sets one item's status. Returns `true` when this update finished the
    /// seller's share of the order and promoted the order to `ready`.
    pub fn update_item_status(&mut self, actor: ActorRef, item_id: Uuid, status: ItemStatus, note: Option<String>) -> Result<bool, OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::Closed(self.status));
        }
        let seller_id = {
            let item = self.items.iter().find(|i| i.id == item_id).ok_or(OrderError::ItemNotFound(item_id))?;
            if actor.role != ActorRole::Admin && item.seller_id != actor.id {
                return Err(OrderError::NotItemOwner(item_id));
            }
            item.seller_id
        };
        let all_ready_before = self.seller_items_ready(seller_id);
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.status = status;
            item.note = note.clone();
        }
        self.touch();

        let promote = actor.role == ActorRole::Seller
            && status == ItemStatus::Ready
            && !all_ready_before
            && self.seller_items_ready(seller_id)
            && self.status.stage().is_some_and(|s| s < 5);
        if promote {
            self.status = OrderStatus::Ready;
            self.record(OrderStatus::Ready, note, actor);
            self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status: OrderStatus::Ready }));
        }
        Ok(promote)
    }

    pub fn cancel(&mut self, actor: ActorRef, reason: Option<String>) -> Result<(), OrderError> {
        if !self.can_be_cancelled() { return Err(OrderError::CannotCancel(self.status)); }
        let now = Utc::now();
        self.status = OrderStatus::Cancelled;
        for item in &mut self.items { item.status = ItemStatus::Cancelled; }
        self.cancellation = Some(Cancellation { cancelled_by: actor, cancelled_at: now, reason: reason.clone(), refund_status: RefundStatus::Pending });
        self.record(OrderStatus::Cancelled, reason.clone(), actor);
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id, reason }));
        Ok(())
    }

    /// Applies a payment outcome reported by the caller and returns the new
    /// payment status. Stock side effects are left to the caller.
    pub fn record_payment(&mut self, actor: ActorRef, update: PaymentUpdate) -> Result<PaymentStatus, OrderError> {
        let from = self.payment.status;
        let to = update.status;
        let open = matches!(from, PaymentStatus::Pending | PaymentStatus::Processing) && !self.status.is_terminal();
        let allowed = match to {
            PaymentStatus::Processing => from == PaymentStatus::Pending && !self.status.is_terminal(),
            PaymentStatus::Completed | PaymentStatus::Failed => open,
            PaymentStatus::Refunded => from == PaymentStatus::Completed && self.status == OrderStatus::Cancelled,
            PaymentStatus::Pending => false,
        };
        if !allowed { return Err(OrderError::InvalidPaymentTransition { from, to }); }

        if update.details.is_some() { self.payment.details = update.details; }
        if update.transaction_id.is_some() { self.payment.transaction_id = update.transaction_id; }
        self.payment.status = to;
        match to {
            PaymentStatus::Processing => {
                if self.status == OrderStatus::PendingPayment { self.status = OrderStatus::PaymentProcessing; }
                self.record(OrderStatus::PaymentProcessing, None, actor);
            }
            PaymentStatus::Completed => {
                let transaction_id = self.payment.transaction_id.get_or_insert_with(|| format!("TXN-{}", Uuid::new_v4().simple())).clone();
                self.payment.paid_at = Some(Utc::now());
                if self.status.stage().is_some_and(|s| s < 2) { self.status = OrderStatus::Paid; }
                for item in &mut self.items {
                    if item.status == ItemStatus::Pending { item.status = ItemStatus::Confirmed; }
                }
                self.record(OrderStatus::Paid, Some("Payment completed".into()), actor);
                self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, transaction_id }));
            }
            PaymentStatus::Failed => {
                self.status = OrderStatus::PaymentFailed;
                self.record(OrderStatus::PaymentFailed, Some("Payment failed".into()), actor);
                self.raise_event(DomainEvent::Order(OrderEvent::PaymentFailed { order_id: self.id }));
            }
            PaymentStatus::Refunded => {
                self.status = OrderStatus::Refunded;
                if let Some(c) = &mut self.cancellation { c.refund_status = RefundStatus::Completed; }
                self.record(OrderStatus::Refunded, Some("Payment refunded".into()), actor);
                self.raise_event(DomainEvent::Order(OrderEvent::Refunded { order_id: self.id }));
            }
            PaymentStatus::Pending => {}
        }
        Ok(to)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn seller_items_ready(&self, seller_id: Uuid) -> bool {
        self.items.iter().filter(|i| i.seller_id == seller_id).all(|i| i.status == ItemStatus::Ready)
    }

    fn record(&mut self, status: OrderStatus, note: Option<String>, actor: ActorRef) {
        let timestamp = Utc::now();
        self.timeline.push(TimelineEntry { status, note, actor, timestamp });
        self.updated_at = timestamp;
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Clone, Debug)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Order cannot be cancelled in status {0}")]
    CannotCancel(OrderStatus),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Order must be paid before moving to {0}")]
    AwaitingPayment(OrderStatus),
    #[error("Order is closed in status {0}")]
    Closed(OrderStatus),
    #[error("Line item {0} not found")]
    ItemNotFound(Uuid),
    #[error("Line item {0} belongs to another seller")]
    NotItemOwner(Uuid),
    #[error("Cannot move payment from {from} to {to}")]
    InvalidPaymentTransition { from: PaymentStatus, to: PaymentStatus },
    #[error(transparent)]
    Currency(#[from] MoneyError),
    #[error("Discounts exceed the order value")]
    DiscountExceedsTotal,
}

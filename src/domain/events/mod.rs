//! Domain events
use crate::domain::aggregates::order::OrderStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, seller_id: Uuid },
    LowStock { product_id: Uuid, available: u32, threshold: u32 },
    OutOfStock { product_id: Uuid },
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, buyer_id: Uuid, total: Decimal },
    StatusChanged { order_id: Uuid, status: OrderStatus },
    Paid { order_id: Uuid, transaction_id: String },
    PaymentFailed { order_id: Uuid },
    Cancelled { order_id: Uuid, reason: Option<String> },
    Refunded { order_id: Uuid },
}

impl DomainEvent {
    /// Subject suffix the event is published under.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::Created { .. }) => "product.created",
            Self::Product(ProductEvent::LowStock { .. }) => "product.low_stock",
            Self::Product(ProductEvent::OutOfStock { .. }) => "product.out_of_stock",
            Self::Product(ProductEvent::Deleted { .. }) => "product.deleted",
            Self::Order(OrderEvent::Placed { .. }) => "order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            Self::Order(OrderEvent::Paid { .. }) => "order.paid",
            Self::Order(OrderEvent::PaymentFailed { .. }) => "order.payment_failed",
            Self::Order(OrderEvent::Cancelled { .. }) => "order.cancelled",
            Self::Order(OrderEvent::Refunded { .. }) => "order.refunded",
        }
    }
}

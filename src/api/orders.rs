//! Order and customer handlers

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::application::{OrderLineRequest, PlaceOrder, StatusTarget, StatusUpdate};
use crate::domain::aggregates::{
    CustomerProfile, CustomizationSelection, DiscountLine, ItemStatus, Order, OrderStatus, PaymentMethod, PaymentStatus,
    PaymentUpdate, ShippingMethod,
};
use crate::domain::identity::Actor;
use crate::domain::value_objects::Address;
use crate::infrastructure::Page;
use crate::{MarketplaceError, Result};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment: PaymentInput,
    #[serde(default)]
    pub shipping: ShippingInput,
    #[serde(default)]
    pub discounts: Vec<DiscountLine>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub method: PaymentMethod,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShippingInput {
    #[serde(default)]
    pub method: ShippingMethod,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[serde(default)]
    pub customization: Vec<CustomizationSelection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub status: String,
    pub item_id: Option<Uuid>,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_status: String,
    pub transaction_id: Option<String>,
    pub payment_details: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub per_page: u32,
}

pub async fn create_order(State(s): State<AppState>, actor: Actor, Json(r): Json<CreateOrderRequest>) -> Result<(StatusCode, Json<Order>)> {
    if r.items.is_empty() {
        return Err(MarketplaceError::Validation("an order needs at least one item".into()));
    }
    r.validate()?;
    for item in &r.items {
        item.validate()?;
    }
    r.shipping_address.validate()?;
    if let Some(billing) = &r.billing_address {
        billing.validate()?;
    }

    let cmd = PlaceOrder {
        items: r
            .items
            .into_iter()
            .map(|i| OrderLineRequest { product_id: i.product_id, quantity: i.quantity, customization: i.customization })
            .collect(),
        shipping_address: r.shipping_address,
        billing_address: r.billing_address,
        payment_method: r.payment.method,
        shipping_method: r.shipping.method,
        discounts: r.discounts,
        notes: r.notes,
    };
    let order = s.orders.create_order(&actor, cmd).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(State(s): State<AppState>, actor: Actor, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Order>>> {
    let page = Page::new(p.page, p.per_page);
    let data = s.orders.list_orders(&actor, page).await?;
    Ok(Json(PaginatedResponse { data, page: page.number, per_page: page.per_page }))
}

pub async fn get_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(s.orders.get_order(&actor, id).await?))
}

pub async fn update_status(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Json(r): Json<StatusRequest>) -> Result<Json<Order>> {
    let target = match r.item_id {
        Some(item_id) => StatusTarget::Item { item_id, status: r.status.parse::<ItemStatus>().map_err(MarketplaceError::Validation)? },
        None => StatusTarget::Order(r.status.parse::<OrderStatus>().map_err(MarketplaceError::Validation)?),
    };
    let order = s.orders.update_status(&actor, id, StatusUpdate { target, note: r.note }).await?;
    Ok(Json(order))
}

pub async fn cancel_order(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, body: Option<Json<CancelRequest>>) -> Result<Json<Order>> {
    let Json(r) = body.unwrap_or_default();
    Ok(Json(s.orders.cancel_order(&actor, id, r.reason).await?))
}

pub async fn update_payment(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Json(r): Json<PaymentRequest>) -> Result<Json<Order>> {
    let status: PaymentStatus = serde_json::from_value(serde_json::Value::String(r.payment_status.clone()))
        .map_err(|_| MarketplaceError::Validation(format!("unknown payment status '{}'", r.payment_status)))?;
    let update = PaymentUpdate { status, transaction_id: r.transaction_id, details: r.payment_details };
    Ok(Json(s.orders.update_payment(&actor, id, update).await?))
}

pub async fn customer_profile(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> Result<Json<CustomerProfile>> {
    Ok(Json(s.orders.customer_profile(&actor, id).await?))
}

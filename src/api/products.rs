//! Catalog handlers

use axum::{extract::{Path, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::AppState;
use crate::application::Reservation;
use crate::domain::aggregates::{CustomizationOption, NewProduct, Product, ProductUpdate};
use crate::domain::identity::Actor;
use crate::domain::value_objects::{Money, DEFAULT_CURRENCY};
use crate::{MarketplaceError, Result};

const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;
const DEFAULT_CRAFTING_TIME: &str = "7 days";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: Decimal,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub discount_price: Option<Decimal>,
    pub quantity: u32,
    pub low_stock_threshold: Option<u32>,
    pub crafting_time: Option<String>,
    #[serde(default)]
    pub customization_options: Vec<CustomizationOption>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    /// `null` clears the discount; omitting the field keeps it.
    #[serde(default, deserialize_with = "present")]
    pub discount_price: Option<Option<Decimal>>,
    pub quantity: Option<u32>,
    pub low_stock_threshold: Option<u32>,
    pub crafting_time: Option<String>,
    pub customization_options: Option<Vec<CustomizationOption>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReserveRequest {
    #[validate(range(min = 1))]
    pub quantity: u32,
}

fn present<'de, D>(d: D) -> std::result::Result<Option<Option<Decimal>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<Decimal>::deserialize(d).map(Some)
}

fn non_negative(field: &str, value: Option<Decimal>) -> Result<()> {
    match value {
        Some(v) if v.is_sign_negative() && !v.is_zero() => Err(MarketplaceError::Validation(format!("{field} cannot be negative"))),
        _ => Ok(()),
    }
}

pub async fn create_product(State(s): State<AppState>, actor: Actor, Json(r): Json<CreateProductRequest>) -> Result<(StatusCode, Json<Product>)> {
    r.validate()?;
    non_negative("price", Some(r.price))?;
    non_negative("discountPrice", r.discount_price)?;
    for option in &r.customization_options {
        non_negative("additionalCost", Some(option.additional_cost))?;
    }

    let currency = r.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
    let new = NewProduct {
        name: r.name,
        description: r.description,
        category: r.category,
        price: Money::new(r.price, currency),
        discount_price: r.discount_price.map(|d| Money::new(d, currency)),
        quantity: r.quantity,
        low_stock_threshold: r.low_stock_threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
        crafting_time: r.crafting_time.unwrap_or_else(|| DEFAULT_CRAFTING_TIME.to_string()),
        customization_options: r.customization_options,
    };
    let product = s.catalog.create_product(&actor, new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    Ok(Json(s.catalog.get_product(id).await?))
}

pub async fn update_product(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Json(r): Json<UpdateProductRequest>) -> Result<Json<Product>> {
    r.validate()?;
    non_negative("price", r.price)?;
    non_negative("discountPrice", r.discount_price.flatten())?;
    for option in r.customization_options.iter().flatten() {
        non_negative("additionalCost", Some(option.additional_cost))?;
    }

    let update = ProductUpdate {
        name: r.name,
        description: r.description,
        category: r.category,
        price: r.price,
        discount_price: r.discount_price,
        quantity: r.quantity,
        low_stock_threshold: r.low_stock_threshold,
        crafting_time: r.crafting_time,
        customization_options: r.customization_options,
    };
    Ok(Json(s.catalog.update_product(&actor, id, update).await?))
}

pub async fn delete_product(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.catalog.delete_product(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reserve_product(State(s): State<AppState>, actor: Actor, Path(id): Path<Uuid>, Json(r): Json<ReserveRequest>) -> Result<Json<Reservation>> {
    r.validate()?;
    Ok(Json(s.catalog.reserve(&actor, id, r.quantity).await?))
}

//! Product Aggregate
//!
//! A sellable catalog entry together with its stock counters. Every change to
//! `quantity` and `reserved_quantity` goes through the inventory methods below,
//! which keep `reserved_quantity <= quantity`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{Money, MoneyError};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: Uuid,
    seller_id: Uuid,
    name: String,
    description: String,
    category: String,
    price: Money,
    discount_price: Option<Money>,
    quantity: u32,
    reserved_quantity: u32,
    low_stock_threshold: u32,
    crafting_time: String,
    customization_options: Vec<CustomizationOption>,
    status: ProductStatus,
    is_deleted: bool,
    sold_count: u32,
    revenue: Money,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// A paid extra the buyer may select, e.g. engraving.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationOption {
    pub name: String,
    #[serde(default)]
    pub additional_cost: Decimal,
    #[serde(default)]
    pub choices: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus { #[default] Active, OutOfStock }

#[derive(Clone, Debug)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub quantity: u32,
    pub low_stock_threshold: u32,
    pub crafting_time: String,
    pub customization_options: Vec<CustomizationOption>,
}

/// Seller edit; `None` leaves a field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub discount_price: Option<Option<Decimal>>,
    pub quantity: Option<u32>,
    pub low_stock_threshold: Option<u32>,
    pub crafting_time: Option<String>,
    pub customization_options: Option<Vec<CustomizationOption>>,
}

impl Product {
    pub fn create(seller_id: Uuid, new: NewProduct) -> Result<Self, ProductError> {
        if new.name.trim().is_empty() { return Err(ProductError::MissingName); }
        validate_options(&new.customization_options)?;
        if let Some(discount) = &new.discount_price {
            validate_discount(&new.price, discount)?;
        }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let currency = new.price.currency().to_string();
        let mut product = Self {
            id, seller_id, name: new.name, description: new.description, category: new.category,
            price: new.price, discount_price: new.discount_price, quantity: new.quantity, reserved_quantity: 0,
            low_stock_threshold: new.low_stock_threshold, crafting_time: new.crafting_time,
            customization_options: new.customization_options, status: ProductStatus::Active, is_deleted: false,
            sold_count: 0, revenue: Money::zero(&currency), created_at: now, updated_at: now, events: vec![],
        };
        product.refresh_status();
        product.raise_event(DomainEvent::Product(ProductEvent::Created { product_id: id, seller_id }));
        Ok(product)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn seller_id(&self) -> Uuid { self.seller_id }
    pub fn name(&self) -> &str { &self.name }
    pub fn category(&self) -> &str { &self.category }
    pub fn price(&self) -> &Money { &self.price }
    pub fn discount_price(&self) -> Option<&Money> { self.discount_price.as_ref() }
    pub fn quantity(&self) -> u32 { self.quantity }
    pub fn reserved_quantity(&self) -> u32 { self.reserved_quantity }
    pub fn available_quantity(&self) -> u32 { self.quantity.saturating_sub(self.reserved_quantity) }
    pub fn low_stock_threshold(&self) -> u32 { self.low_stock_threshold }
    pub fn crafting_time(&self) -> &str { &self.crafting_time }
    pub fn customization_options(&self) -> &[CustomizationOption] { &self.customization_options }
    pub fn status(&self) -> ProductStatus { self.status }
    pub fn is_deleted(&self) -> bool { self.is_deleted }
    pub fn sold_count(&self) -> u32 { self.sold_count }
    pub fn revenue(&self) -> &Money { &self.revenue }
    pub fn is_low_stock(&self) -> bool { self.available_quantity() <= self.low_stock_threshold }

    /// Price charged per unit: the discount price when one is set.
    pub fn effective_price(&self) -> &Money { self.discount_price.as_ref().unwrap_or(&self.price) }

    pub fn is_in_stock(&self, requested: u32) -> bool { self.available_quantity() >= requested }

    /// Holds `qty` units for a pending order. Returns `false` without side
    /// effects when not enough stock is available.
    pub fn reserve_inventory(&mut self, qty: u32) -> bool {
        if !self.is_in_stock(qty) { return false; }
        let before = self.available_quantity();
        self.reserved_quantity += qty;
        self.note_low_stock(before);
        self.touch();
        true
    }

    /// Gives back held units; floored at zero so a repeated release is harmless.
    pub fn release_reserved_inventory(&mut self, qty: u32) {
        self.reserved_quantity = self.reserved_quantity.saturating_sub(qty);
        self.touch();
    }

    /// Turns a reservation into a permanent deduction. Fails without side
    /// effects when `sale_total` is not in the product's currency.
    pub fn complete_sale(&mut self, qty: u32, sale_total: &Money) -> Result<(), ProductError> {
        let revenue = self.revenue.add(sale_total)?;
        let before = self.available_quantity();
        self.quantity = self.quantity.saturating_sub(qty);
        self.reserved_quantity = self.reserved_quantity.saturating_sub(qty).min(self.quantity);
        self.sold_count = self.sold_count.saturating_add(qty);
        self.revenue = revenue;
        self.refresh_status();
        self.note_low_stock(before);
        self.touch();
        Ok(())
    }

    /// Puts sold units back on the shelf, reversing `complete_sale`.
    pub fn restock(&mut self, qty: u32, sale_total: &Money) -> Result<(), ProductError> {
        let revenue = self.revenue.subtract(sale_total)?;
        self.quantity = self.quantity.saturating_add(qty);
        self.sold_count = self.sold_count.saturating_sub(qty);
        self.revenue = revenue;
        self.refresh_status();
        self.touch();
        Ok(())
    }

    pub fn apply_update(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        if let Some(quantity) = update.quantity {
            if quantity < self.reserved_quantity {
                return Err(ProductError::QuantityBelowReserved { requested: quantity, reserved: self.reserved_quantity });
            }
        }
        let price = update.price.map(|p| Money::new(p, self.price.currency())).unwrap_or_else(|| self.price.clone());
        let discount = match update.discount_price {
            Some(d) => d.map(|d| Money::new(d, self.price.currency())),
            None => self.discount_price.clone(),
        };
        if let Some(d) = &discount { validate_discount(&price, d)?; }
        if let Some(options) = &update.customization_options { validate_options(options)?; }
        if let Some(name) = update.name {
            if name.trim().is_empty() { return Err(ProductError::MissingName); }
            self.name = name;
        }
        if let Some(description) = update.description { self.description = description; }
        if let Some(category) = update.category { self.category = category; }
        if let Some(quantity) = update.quantity { self.quantity = quantity; }
        if let Some(threshold) = update.low_stock_threshold { self.low_stock_threshold = threshold; }
        if let Some(crafting_time) = update.crafting_time { self.crafting_time = crafting_time; }
        if let Some(options) = update.customization_options { self.customization_options = options; }
        self.price = price;
        self.discount_price = discount;
        self.refresh_status();
        self.touch();
        Ok(())
    }

    pub fn soft_delete(&mut self) {
        if self.is_deleted { return; }
        self.is_deleted = true;
        self.touch();
        self.raise_event(DomainEvent::Product(ProductEvent::Deleted { product_id: self.id }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn refresh_status(&mut self) {
        let next = if self.quantity == 0 { ProductStatus::OutOfStock } else { ProductStatus::Active };
        if next == ProductStatus::OutOfStock && self.status != ProductStatus::OutOfStock {
            self.raise_event(DomainEvent::Product(ProductEvent::OutOfStock { product_id: self.id }));
        }
        self.status = next;
    }

    // Raised once, when availability crosses the threshold.
    fn note_low_stock(&mut self, available_before: u32) {
        let available = self.available_quantity();
        if available <= self.low_stock_threshold && available_before > self.low_stock_threshold {
            tracing::warn!(product_id = %self.id, available, threshold = self.low_stock_threshold, "Product stock is running low");
            self.raise_event(DomainEvent::Product(ProductEvent::LowStock {
                product_id: self.id, available, threshold: self.low_stock_threshold,
            }));
        }
    }

    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn validate_discount(price: &Money, discount: &Money) -> Result<(), ProductError> {
    if discount.currency() != price.currency() { return Err(ProductError::CurrencyMismatch); }
    if discount.amount() > price.amount() || discount.is_negative() { return Err(ProductError::InvalidDiscount); }
    Ok(())
}

fn validate_options(options: &[CustomizationOption]) -> Result<(), ProductError> {
    match options.iter().find(|o| o.additional_cost.is_sign_negative() && !o.additional_cost.is_zero()) {
        Some(o) => Err(ProductError::NegativeSurcharge(o.name.clone())),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("Product name is required")]
    MissingName,
    #[error("Discount price must use the product's currency")]
    CurrencyMismatch,
    #[error("Discount price must be between zero and the base price")]
    InvalidDiscount,
    #[error("Quantity {requested} is below the {reserved} units currently reserved")]
    QuantityBelowReserved { requested: u32, reserved: u32 },
    #[error("Customization '{0}' cannot have a negative additional cost")]
    NegativeSurcharge(String),
    #[error(transparent)]
    Revenue(#[from] MoneyError),
}

//! Artisan Marketplace
//!
//! Order and inventory service for a multi-role marketplace where artisans,
//! suppliers and tourism providers sell to customers.
//!
//! ## Features
//! - Product catalog with stock reservation
//! - Order placement with atomic multi-item reservation
//! - Status timeline, cancellation and payment handling
//! - Loyalty points and purchase statistics

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use domain::aggregates::{OrderError, OrderStatus, ProductError};
use infrastructure::RepoError;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum MarketplaceError {
    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Line item {0} not found")]
    ItemNotFound(Uuid),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: Uuid, requested: u32, available: u32 },

    #[error("Could not reserve inventory for product {0}")]
    ReservationFailed(Uuid),

    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { product_id: Uuid, requested: u32, available: u32 },

    #[error("Order cannot be cancelled in status {0}")]
    CannotCancel(OrderStatus),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    InvalidPaymentTransition(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

pub type Result<T> = std::result::Result<T, MarketplaceError>;

impl MarketplaceError {
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::ItemNotFound(_) => "ITEM_NOT_FOUND",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ReservationFailed(_) => "INVENTORY_RESERVATION_FAILED",
            Self::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            Self::CannotCancel(_) => "CANNOT_CANCEL_ORDER",
            Self::InvalidTransition(_) => "INVALID_STATUS_TRANSITION",
            Self::InvalidPaymentTransition(_) => "INVALID_PAYMENT_TRANSITION",
            Self::AccessDenied(_) => "ACCESS_DENIED",
            Self::Unauthenticated => "AUTHENTICATION_REQUIRED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::ProductNotFound(_) | Self::OrderNotFound(_) | Self::ItemNotFound(_) => StatusCode::NOT_FOUND,
            Self::AccessDenied(_) => StatusCode::FORBIDDEN,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<OrderError> for MarketplaceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::CannotCancel(status) => Self::CannotCancel(status),
            OrderError::ItemNotFound(id) => Self::ItemNotFound(id),
            OrderError::NotItemOwner(_) => Self::AccessDenied(e.to_string()),
            OrderError::InvalidTransition { .. } | OrderError::AwaitingPayment(_) | OrderError::Closed(_) => Self::InvalidTransition(e.to_string()),
            OrderError::InvalidPaymentTransition { .. } => Self::InvalidPaymentTransition(e.to_string()),
            OrderError::NoItems | OrderError::Currency(_) | OrderError::DiscountExceedsTotal => Self::Validation(e.to_string()),
        }
    }
}

impl From<ProductError> for MarketplaceError {
    fn from(e: ProductError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<validator::ValidationErrors> for MarketplaceError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({ "error": self.to_string(), "code": self.code() });
        match &self {
            Self::ProductNotFound(id) | Self::ReservationFailed(id) => {
                body["productId"] = json!(id);
            }
            Self::InsufficientStock { product_id, requested, available }
            | Self::InsufficientInventory { product_id, requested, available } => {
                body["productId"] = json!(product_id);
                body["requested"] = json!(requested);
                body["available"] = json!(available);
            }
            Self::CannotCancel(current) => {
                body["currentStatus"] = json!(current);
            }
            Self::Storage(e) => {
                tracing::error!(target: "database", error = %e, "Storage error occurred");
                body["error"] = json!("Internal server error");
            }
            _ => {}
        }
        (status, Json(body)).into_response()
    }
}

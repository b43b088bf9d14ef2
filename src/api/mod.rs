//! HTTP surface

pub mod extract;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::{routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::application::{CatalogService, OrderService};
use crate::config::OrderPolicy;
use crate::infrastructure::{EventPublisher, MarketplaceStore};

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderService,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketplaceStore>, events: EventPublisher, policy: OrderPolicy) -> Self {
        Self {
            orders: OrderService::new(store.clone(), events.clone(), policy),
            catalog: CatalogService::new(store, events),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "artisan-marketplace"})) }))
        .route("/api/v1/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/orders/:id/cancel", put(orders::cancel_order))
        .route("/api/v1/orders/:id/payment", put(orders::update_payment))
        .route("/api/v1/customers/:id/profile", get(orders::customer_profile))
        .route("/api/v1/products", post(products::create_product))
        .route("/api/v1/products/:id", get(products::get_product).put(products::update_product).delete(products::delete_product))
        .route("/api/v1/products/:id/reserve", post(products::reserve_product))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Persistence ports
//!
//! Writes always happen inside a [`UnitOfWork`]: everything staged in one unit
//! becomes visible together on `commit`, and nothing does on `rollback` or drop.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{CustomerProfile, Order, Product};
use crate::domain::identity::Actor;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt document: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate(db.message().to_string()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub number: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(number: Option<u32>, per_page: Option<u32>) -> Self {
        Self { number: number.unwrap_or(1).max(1), per_page: per_page.unwrap_or(20).clamp(1, 100) }
    }

    pub fn offset(&self) -> u32 { (self.number - 1) * self.per_page }
}

/// Entry point to the backing store.
#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>>;

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>>;
    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>>;
    /// Orders visible to `actor`, newest first.
    async fn list_orders(&self, actor: &Actor, page: Page) -> RepoResult<Vec<Order>>;
    async fn find_customer_profile(&self, customer_id: Uuid) -> RepoResult<Option<CustomerProfile>>;
}

/// One transaction. Reads through `lock_*` hold the row until the unit ends.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn lock_product(&mut self, id: Uuid) -> RepoResult<Option<Product>>;
    async fn insert_product(&mut self, product: &Product) -> RepoResult<()>;
    async fn save_product(&mut self, product: &Product) -> RepoResult<()>;

    async fn lock_order(&mut self, id: Uuid) -> RepoResult<Option<Order>>;
    async fn insert_order(&mut self, order: &Order) -> RepoResult<()>;
    async fn save_order(&mut self, order: &Order) -> RepoResult<()>;

    /// Next value of the per-day order counter, starting at 1.
    async fn next_order_sequence(&mut self, day: NaiveDate) -> RepoResult<u32>;

    async fn credit_loyalty_points(&mut self, customer_id: Uuid, points: i64) -> RepoResult<()>;
    async fn record_purchase(&mut self, customer_id: Uuid, amount: Decimal, at: DateTime<Utc>) -> RepoResult<()>;

    async fn commit(self: Box<Self>) -> RepoResult<()>;
    async fn rollback(self: Box<Self>) -> RepoResult<()>;
}

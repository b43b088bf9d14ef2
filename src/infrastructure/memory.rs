//! In-memory store for tests and local development
//!
//! A unit of work holds the store-wide lock for its whole lifetime and edits a
//! private copy of the data; `commit` swaps the copy in. Transactions are
//! therefore fully serialised.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::store::{MarketplaceStore, Page, RepoError, RepoResult, UnitOfWork};
use crate::domain::aggregates::{CustomerProfile, Order, Product};
use crate::domain::identity::{Actor, ActorRole};

#[derive(Clone, Default)]
struct Snapshot {
    products: HashMap<Uuid, Product>,
    orders: HashMap<Uuid, Order>,
    sequences: HashMap<NaiveDate, u32>,
    profiles: HashMap<Uuid, CustomerProfile>,
}

/// Thread-safe in-memory store
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<Snapshot>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(&id).cloned())
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, actor: &Actor, page: Page) -> RepoResult<Vec<Order>> {
        let state = self.state.lock().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| match actor.role.actor_role() {
                ActorRole::Buyer => o.buyer_id() == actor.id,
                ActorRole::Seller => o.involves_seller(actor.id),
                ActorRole::Admin => true,
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.ordered_at().cmp(&a.ordered_at()));
        Ok(orders
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect())
    }

    async fn find_customer_profile(&self, customer_id: Uuid) -> RepoResult<Option<CustomerProfile>> {
        Ok(self.state.lock().await.profiles.get(&customer_id).cloned())
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Snapshot>,
    working: Snapshot,
}

impl MemoryUnitOfWork {
    fn profile(&mut self, customer_id: Uuid) -> &mut CustomerProfile {
        self.working
            .profiles
            .entry(customer_id)
            .or_insert_with(|| CustomerProfile::new(customer_id))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn lock_product(&mut self, id: Uuid) -> RepoResult<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn insert_product(&mut self, product: &Product) -> RepoResult<()> {
        if self.working.products.contains_key(&product.id()) {
            return Err(RepoError::Duplicate(format!("product {}", product.id())));
        }
        self.working.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn save_product(&mut self, product: &Product) -> RepoResult<()> {
        if product.reserved_quantity() > product.quantity() {
            return Err(RepoError::Database(format!("stock check violated for product {}", product.id())));
        }
        self.working.products.insert(product.id(), product.clone());
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> RepoResult<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> RepoResult<()> {
        let taken = self
            .working
            .orders
            .values()
            .any(|o| o.id() == order.id() || o.order_number() == order.order_number());
        if taken {
            return Err(RepoError::Duplicate(format!("order number {}", order.order_number())));
        }
        self.working.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn save_order(&mut self, order: &Order) -> RepoResult<()> {
        self.working.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn next_order_sequence(&mut self, day: NaiveDate) -> RepoResult<u32> {
        let counter = self.working.sequences.entry(day).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn credit_loyalty_points(&mut self, customer_id: Uuid, points: i64) -> RepoResult<()> {
        self.profile(customer_id).credit_points(points);
        Ok(())
    }

    async fn record_purchase(&mut self, customer_id: Uuid, amount: Decimal, at: DateTime<Utc>) -> RepoResult<()> {
        self.profile(customer_id).record_purchase(amount, at);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        let MemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        Ok(())
    }
}

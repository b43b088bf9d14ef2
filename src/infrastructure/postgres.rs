//! PostgreSQL store
//!
//! Aggregates are kept as JSONB documents next to the columns we filter and
//! constrain on. The `products` table carries a CHECK constraint mirroring
//! `0 <= reserved_quantity <= quantity`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::store::{MarketplaceStore, Page, RepoResult, UnitOfWork};
use crate::domain::aggregates::{CustomerProfile, Order, Product};
use crate::domain::identity::{Actor, ActorRole};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketplaceStore for PgStore {
    async fn begin(&self) -> RepoResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(PgUnitOfWork { tx: self.pool.begin().await? }))
    }

    async fn find_product(&self, id: Uuid) -> RepoResult<Option<Product>> {
        let row: Option<(Json<Product>,)> = sqlx::query_as("SELECT document FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(p),)| p))
    }

    async fn find_order(&self, id: Uuid) -> RepoResult<Option<Order>> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(Json(o),)| o))
    }

    async fn list_orders(&self, actor: &Actor, page: Page) -> RepoResult<Vec<Order>> {
        let filter = match actor.role.actor_role() {
            ActorRole::Buyer => "WHERE buyer_id = $1",
            ActorRole::Seller => "WHERE $1 = ANY(seller_ids)",
            ActorRole::Admin => "WHERE $1 IS NOT NULL",
        };
        let sql = format!("SELECT document FROM orders {filter} ORDER BY ordered_at DESC LIMIT $2 OFFSET $3");
        let rows: Vec<(Json<Order>,)> = sqlx::query_as(&sql)
            .bind(actor.id).bind(page.per_page as i64).bind(page.offset() as i64)
            .fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(Json(o),)| o).collect())
    }

    async fn find_customer_profile(&self, customer_id: Uuid) -> RepoResult<Option<CustomerProfile>> {
        let profile = sqlx::query_as::<_, CustomerProfile>(
            "SELECT customer_id, loyalty_points, total_orders, total_spent, last_order_at FROM customer_profiles WHERE customer_id = $1")
            .bind(customer_id).fetch_optional(&self.pool).await?;
        Ok(profile)
    }
}

pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn lock_product(&mut self, id: Uuid) -> RepoResult<Option<Product>> {
        let row: Option<(Json<Product>,)> = sqlx::query_as("SELECT document FROM products WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(|(Json(p),)| p))
    }

    async fn insert_product(&mut self, p: &Product) -> RepoResult<()> {
        sqlx::query("INSERT INTO products (id, seller_id, quantity, reserved_quantity, is_deleted, document, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())")
            .bind(p.id()).bind(p.seller_id()).bind(p.quantity() as i64).bind(p.reserved_quantity() as i64).bind(p.is_deleted()).bind(Json(p))
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn save_product(&mut self, p: &Product) -> RepoResult<()> {
        sqlx::query("UPDATE products SET quantity = $2, reserved_quantity = $3, is_deleted = $4, document = $5, updated_at = NOW() WHERE id = $1")
            .bind(p.id()).bind(p.quantity() as i64).bind(p.reserved_quantity() as i64).bind(p.is_deleted()).bind(Json(p))
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn lock_order(&mut self, id: Uuid) -> RepoResult<Option<Order>> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1 FOR UPDATE")
            .bind(id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(|(Json(o),)| o))
    }

    async fn insert_order(&mut self, o: &Order) -> RepoResult<()> {
        sqlx::query("INSERT INTO orders (id, order_number, buyer_id, seller_ids, status, ordered_at, document, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())")
            .bind(o.id()).bind(o.order_number().as_str()).bind(o.buyer_id()).bind(o.seller_ids()).bind(o.status().as_str()).bind(o.ordered_at()).bind(Json(o))
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn save_order(&mut self, o: &Order) -> RepoResult<()> {
        sqlx::query("UPDATE orders SET status = $2, document = $3, updated_at = NOW() WHERE id = $1")
            .bind(o.id()).bind(o.status().as_str()).bind(Json(o))
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn next_order_sequence(&mut self, day: NaiveDate) -> RepoResult<u32> {
        let (value,): (i32,) = sqlx::query_as(
            "INSERT INTO order_sequences (day, last_value) VALUES ($1, 1) ON CONFLICT (day) DO UPDATE SET last_value = order_sequences.last_value + 1 RETURNING last_value")
            .bind(day).fetch_one(&mut *self.tx).await?;
        Ok(value.max(0) as u32)
    }

    async fn credit_loyalty_points(&mut self, customer_id: Uuid, points: i64) -> RepoResult<()> {
        sqlx::query("INSERT INTO customer_profiles (customer_id, loyalty_points) VALUES ($1, $2) ON CONFLICT (customer_id) DO UPDATE SET loyalty_points = customer_profiles.loyalty_points + $2")
            .bind(customer_id).bind(points)
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn record_purchase(&mut self, customer_id: Uuid, amount: Decimal, at: DateTime<Utc>) -> RepoResult<()> {
        sqlx::query("INSERT INTO customer_profiles (customer_id, total_orders, total_spent, last_order_at) VALUES ($1, 1, $2, $3) ON CONFLICT (customer_id) DO UPDATE SET total_orders = customer_profiles.total_orders + 1, total_spent = customer_profiles.total_spent + $2, last_order_at = $3")
            .bind(customer_id).bind(amount).bind(at)
            .execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> RepoResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> RepoResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

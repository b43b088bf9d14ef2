//! Environment-driven configuration

use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub nats_url: Option<String>,
    pub orders: OrderPolicy,
}

/// Knobs of the order workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPolicy {
    pub order_number_prefix: String,
    pub tax_rate: Decimal,
}

impl Default for OrderPolicy {
    fn default() -> Self {
        Self { order_number_prefix: "ORD".to_string(), tax_rate: Decimal::ZERO }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: parsed("PORT").unwrap_or(8083),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            max_connections: parsed("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            nats_url: std::env::var("NATS_URL").ok().filter(|v| !v.is_empty()),
            orders: OrderPolicy {
                order_number_prefix: std::env::var("ORDER_NUMBER_PREFIX").unwrap_or_else(|_| "ORD".into()),
                tax_rate: parsed("TAX_RATE").unwrap_or(Decimal::ZERO),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

//! Customer profile: the buyer-specific extension of a base identity

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub customer_id: Uuid,
    pub loyalty_points: i64,
    pub total_orders: i32,
    pub total_spent: Decimal,
    pub last_order_at: Option<DateTime<Utc>>,
}

impl CustomerProfile {
    pub fn new(customer_id: Uuid) -> Self {
        Self { customer_id, loyalty_points: 0, total_orders: 0, total_spent: Decimal::ZERO, last_order_at: None }
    }

    pub fn credit_points(&mut self, points: i64) { self.loyalty_points = self.loyalty_points.saturating_add(points); }

    pub fn record_purchase(&mut self, amount: Decimal, at: DateTime<Utc>) {
        self.total_orders = self.total_orders.saturating_add(1);
        self.total_spent += amount;
        self.last_order_at = Some(at);
    }
}

/// One point per full 100 units spent.
pub fn loyalty_points_for(total: &Money) -> i64 {
    (total.amount() / Decimal::from(100)).floor().to_i64().unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loyalty_points() {
        assert_eq!(loyalty_points_for(&Money::usd(Decimal::from(650))), 6);
        assert_eq!(loyalty_points_for(&Money::usd(Decimal::new(9999, 2))), 0);
        assert_eq!(loyalty_points_for(&Money::usd(Decimal::from(200))), 2);
    }

    #[test]
    fn test_purchase_stats() {
        let mut profile = CustomerProfile::new(Uuid::now_v7());
        profile.credit_points(6);
        profile.record_purchase(Decimal::from(650), Utc::now());
        assert_eq!(profile.loyalty_points, 6);
        assert_eq!(profile.total_orders, 1);
        assert_eq!(profile.total_spent, Decimal::from(650));
        assert!(profile.last_order_at.is_some());
    }
}

//! Value Objects for the marketplace

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn usd(amount: Decimal) -> Self { Self::new(amount, "USD") }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_negative(&self) -> bool { self.amount.is_sign_negative() && !self.amount.is_zero() }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, &self.currency))
    }

    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }

    /// Applies a rate (e.g. a tax rate) and rounds to cents.
    pub fn scale(&self, rate: Decimal) -> Money { Money::new((self.amount * rate).round_dp(2), &self.currency) }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch { left: self.currency.clone(), right: other.currency.clone() });
        }
        Ok(())
    }
}

impl Default for Money { fn default() -> Self { Self::zero(DEFAULT_CURRENCY) } }

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.amount, self.currency) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },
}

/// Postal address captured on the order at placement time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub street1: String,
    pub street2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    pub state: Option<String>,
    pub zip: String,
    #[validate(length(min = 2))]
    pub country: String,
    pub phone: Option<String>,
}

/// Crafting lead time parsed from a seller's free-text estimate.
///
/// Accepts `"<N> day(s)"` and `"<N> week(s)"`; anything else counts as a week.
/// Estimates are capped at [`LeadTime::MAX_DAYS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeadTime { days: i64 }

impl LeadTime {
    pub const DEFAULT_DAYS: i64 = 7;
    /// Extra crafting days for an item carrying customization.
    pub const CUSTOMIZATION_DAYS: i64 = 7;
    pub const MAX_DAYS: i64 = 3650;

    pub fn parse(text: &str) -> Self {
        let lowered = text.trim().to_lowercase();
        let mut parts = lowered.split_whitespace();
        let days = match (parts.next().and_then(|n| n.parse::<i64>().ok()), parts.next(), parts.next()) {
            (Some(n), Some("day" | "days"), None) if n >= 0 => n,
            (Some(n), Some("week" | "weeks"), None) if n >= 0 => n.checked_mul(7).unwrap_or(i64::MAX),
            _ => Self::DEFAULT_DAYS,
        };
        Self { days: days.min(Self::MAX_DAYS) }
    }

    pub fn days(&self) -> i64 { self.days }

    pub fn with_customization(self, customized: bool) -> Self {
        if customized { Self { days: self.days + Self::CUSTOMIZATION_DAYS } } else { self }
    }
}

/// Human-facing order identifier: `<PREFIX><YYYYMMDD><NNNN>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(prefix: &str, day: NaiveDate, sequence: u32) -> Self {
        Self(format!("{}{}{:04}", prefix, day.format("%Y%m%d"), sequence))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_add() {
        let a = Money::usd(Decimal::new(100, 0));
        let b = Money::usd(Decimal::new(50, 0));
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert_eq!(a.subtract(&b).unwrap().amount(), Decimal::new(50, 0));
    }

    #[test]
    fn test_money_currency_mismatch() {
        let a = Money::usd(Decimal::ONE);
        let b = Money::new(Decimal::ONE, "ngn");
        assert_eq!(b.currency(), "NGN");
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn test_lead_time_parsing() {
        assert_eq!(LeadTime::parse("2 weeks").days(), 14);
        assert_eq!(LeadTime::parse("1 week").days(), 7);
        assert_eq!(LeadTime::parse("5 days").days(), 5);
        assert_eq!(LeadTime::parse(" 1 Day ").days(), 1);
        assert_eq!(LeadTime::parse("about a month").days(), LeadTime::DEFAULT_DAYS);
        assert_eq!(LeadTime::parse("").days(), LeadTime::DEFAULT_DAYS);
        assert_eq!(LeadTime::parse("5 days").with_customization(true).days(), 12);
    }

    #[test]
    fn test_lead_time_is_capped() {
        assert_eq!(LeadTime::parse("100000000 days").days(), LeadTime::MAX_DAYS);
        assert_eq!(LeadTime::parse("2000000000000000000 weeks").days(), LeadTime::MAX_DAYS);
        assert_eq!(LeadTime::parse("99999999999999999999 days").days(), LeadTime::DEFAULT_DAYS);
        assert_eq!(
            LeadTime::parse("2000000000000000000 weeks").with_customization(true).days(),
            LeadTime::MAX_DAYS + LeadTime::CUSTOMIZATION_DAYS
        );
    }

    #[test]
    fn test_order_number_format() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(OrderNumber::new("ORD", day, 7).as_str(), "ORD202603090007");
    }
}

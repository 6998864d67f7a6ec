//! Money amounts in Brazilian reais using decimal arithmetic.
//!
//! The backend sends prices either as JSON numbers (`12.5`) or as numeric
//! strings (`"12.50"`); both deserialize into [`Price`]. Outgoing payloads
//! serialize as JSON numbers.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Mul, Sub};
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`Price`] from user input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("valor não informado")]
    Empty,
    /// The input is not a number.
    #[error("valor inválido: {0}")]
    Invalid(String),
    /// Negative amounts are not accepted from forms.
    #[error("valor não pode ser negativo")]
    Negative,
}

/// A money amount in BRL, rounded to cents for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// Zero reais.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a price from an amount in cents.
    #[must_use]
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, 2))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount in whole cents, rounded.
    #[must_use]
    pub fn to_cents(&self) -> i64 {
        (self.0.round_dp(2) * Decimal::ONE_HUNDRED)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Even share over `parts`, `None` when there are no parts.
    #[must_use]
    pub fn dividido_por(&self, parts: u64) -> Option<Self> {
        (parts > 0).then(|| Self(self.0 / Decimal::from(parts)))
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Parse a price typed into a form.
    ///
    /// Accepts `10`, `10.5`, `10,50`, `R$ 1.234,56` and `1234.56`. When both
    /// separators are present the last one is the decimal separator.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError`] for empty, non-numeric or negative input.
    pub fn parse_input(input: &str) -> Result<Self, PriceError> {
        let cleaned: String = input
            .trim()
            .trim_start_matches("R$")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Err(PriceError::Empty);
        }

        let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
            (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
            (Some(_), Some(_)) => cleaned.replace(',', ""),
            (Some(_), None) => cleaned.replace(',', "."),
            _ => cleaned,
        };

        let amount = Decimal::from_str(&normalized)
            .map_err(|_| PriceError::Invalid(input.trim().to_string()))?;

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        Ok(Self(amount))
    }

    /// Format for display, e.g. `R$ 1.234,56`.
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.0.round_dp(2);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = format!("{:.2}", rounded.abs());
        let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let sign = if negative { "-" } else { "" };
        format!("{sign}R$ {grouped},{frac_part}")
    }

    /// Format as a plain decimal for form inputs, e.g. `12.50`.
    #[must_use]
    pub fn to_input(&self) -> String {
        format!("{:.2}", self.0.round_dp(2))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Price {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self::Output {
        Self(self.0 * Decimal::from(rhs))
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Price {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.round_dp(2).to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

struct PriceVisitor;

impl Visitor<'_> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Price(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Price(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Decimal::try_from(v)
            .map(|d| Price(d.round_dp(4)))
            .map_err(|_| E::custom(format!("invalid price: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Decimal::from_str(v.trim())
            .map(Price)
            .map_err(|_| E::custom(format!("invalid price: {v}")))
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Price::from_cents(123_456).display(), "R$ 1.234,56");
        assert_eq!(Price::from_cents(1000).display(), "R$ 10,00");
        assert_eq!(Price::from_cents(5).display(), "R$ 0,05");
        assert_eq!(Price::from_cents(100_000_000).display(), "R$ 1.000.000,00");
    }

    #[test]
    fn test_display_negative() {
        assert_eq!(Price::from_cents(-250).display(), "-R$ 2,50");
    }

    #[test]
    fn test_parse_input_formats() {
        assert_eq!(Price::parse_input("10").unwrap(), Price::from_cents(1000));
        assert_eq!(Price::parse_input("10,50").unwrap(), Price::from_cents(1050));
        assert_eq!(Price::parse_input("10.5").unwrap(), Price::from_cents(1050));
        assert_eq!(
            Price::parse_input("R$ 1.234,56").unwrap(),
            Price::from_cents(123_456)
        );
        assert_eq!(
            Price::parse_input("1,234.56").unwrap(),
            Price::from_cents(123_456)
        );
    }

    #[test]
    fn test_parse_input_errors() {
        assert_eq!(Price::parse_input("  "), Err(PriceError::Empty));
        assert!(matches!(
            Price::parse_input("dez"),
            Err(PriceError::Invalid(_))
        ));
        assert_eq!(Price::parse_input("-3"), Err(PriceError::Negative));
    }

    #[test]
    fn test_deserialize_number_and_string() {
        let a: Price = serde_json::from_str("12.5").unwrap();
        let b: Price = serde_json::from_str("\"12.50\"").unwrap();
        let c: Price = serde_json::from_str("12").unwrap();
        assert_eq!(a, b);
        assert_eq!(c, Price::from_cents(1200));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&Price::from_cents(1050)).unwrap();
        assert_eq!(json, "10.5");
    }

    #[test]
    fn test_cents_and_even_share() {
        assert_eq!(Price::from_cents(1050).to_cents(), 1050);
        assert_eq!(
            Price::from_cents(1000).dividido_por(4),
            Some(Price::from_cents(250))
        );
        assert_eq!(Price::from_cents(1000).dividido_por(0), None);
    }

    #[test]
    fn test_arithmetic() {
        let total: Price = [Price::from_cents(1000), Price::from_cents(250)]
            .iter()
            .sum();
        assert_eq!(total, Price::from_cents(1250));
        assert_eq!(Price::from_cents(300) * 3, Price::from_cents(900));
        assert_eq!(
            Price::from_cents(1000) - Price::from_cents(250),
            Price::from_cents(750)
        );
    }
}

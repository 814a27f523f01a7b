//! Amount type for exact monetary values.
//!
//! This module provides the `Amount` type which wraps `Decimal` so that
//! monetary arithmetic and parsing never go through a binary floating point
//! representation.

use crate::error::{Error, Result};
use crate::model::Currency;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Represents an exact monetary quantity.
///
/// Parsing a user-entered string that is not a valid decimal fails with
/// `Error::Conversion`, preserving the offending text:
///
/// ```
/// # use spending_sync::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("2.50").unwrap();
/// assert_eq!(amount.to_string(), "2.50");
/// assert!(Amount::from_str("two-fifty").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    /// Creates a new Amount from a Decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Renders the amount the way the given currency is customarily written,
    /// with thousands grouping. Forints carry no decimal places.
    ///
    /// ```
    /// # use spending_sync::{Amount, Currency};
    /// # use std::str::FromStr;
    /// let amount = Amount::from_str("1234.56").unwrap();
    /// assert_eq!(amount.formatted(Currency::Usd), "$1,234.56");
    /// assert_eq!(amount.formatted(Currency::Eur), "1,234.56 €");
    /// assert_eq!(amount.formatted(Currency::Huf), "1,235 Ft");
    /// ```
    pub fn formatted(&self, currency: Currency) -> String {
        let value = self.0.to_f64().unwrap_or_default();
        match currency {
            Currency::Huf => format!("{} Ft", format_num::format_num!(",.0", value)),
            Currency::Eur => format!("{} €", format_num::format_num!(",.2", value)),
            Currency::Usd => format!("${}", format_num::format_num!(",.2", value)),
        }
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed).map_err(|_| Error::Conversion {
            raw: s.to_string(),
        })?;
        Ok(Amount(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialized as a string so the cache round-trips without precision
        // loss. The wire decoder accepts both strings and JSON numbers.
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(serde_json::Number),
        }

        let raw = match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        };
        Decimal::from_str(&raw)
            .map(Amount)
            .map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("2.50").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("2.50").unwrap());
    }

    #[test]
    fn test_parse_negative() {
        let amount = Amount::from_str("-17.05").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("-17.05").unwrap());
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  2.50  ").unwrap();
        assert_eq!(amount.value(), Decimal::from_str("2.50").unwrap());
    }

    #[test]
    fn test_parse_garbage_preserves_raw() {
        let err = Amount::from_str("two-fifty").unwrap_err();
        match err {
            Error::Conversion { raw } => assert_eq!(raw, "two-fifty"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_preserves_trailing_zero() {
        // 2.50 and 2.5 are numerically equal but 2.50 must not degrade to a
        // float on the way in.
        let amount = Amount::from_str("2.50").unwrap();
        assert_eq!(amount.to_string(), "2.50");
    }

    #[test]
    fn test_serialize_as_string() {
        let amount = Amount::from_str("100.10").unwrap();
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"100.10\"");
    }

    #[test]
    fn test_deserialize_from_string() {
        let amount: Amount = serde_json::from_str("\"100.10\"").unwrap();
        assert_eq!(amount, Amount::from_str("100.10").unwrap());
    }

    #[test]
    fn test_deserialize_from_number() {
        let amount: Amount = serde_json::from_str("1300").unwrap();
        assert_eq!(amount.value(), Decimal::from(1300));
    }

    #[test]
    fn test_formatted_huf() {
        let amount = Amount::from_str("1300").unwrap();
        assert_eq!(amount.formatted(Currency::Huf), "1,300 Ft");
    }

    #[test]
    fn test_formatted_eur() {
        let amount = Amount::from_str("2.5").unwrap();
        assert_eq!(amount.formatted(Currency::Eur), "2.50 €");
    }

    #[test]
    fn test_formatted_usd_negative() {
        let amount = Amount::from_str("-60000").unwrap();
        assert_eq!(amount.formatted(Currency::Usd), "$-60,000.00");
    }

    #[test]
    fn test_is_zero() {
        assert!(Amount::default().is_zero());
        assert!(!Amount::from_str("0.01").unwrap().is_zero());
    }
}

//! Monetary amount of a proposal
//!
//! Stored remotely as a string to avoid floating-point drift; parsed into a
//! `Decimal` for arithmetic.

use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(String),
    #[error("amount is not a number: '{0}'")]
    Malformed(String),
}

/// Non-negative decimal amount
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| AmountError::Malformed(s.to_string()))?;
        Self::new(value)
    }
}

impl From<u32> for Amount {
    fn from(value: u32) -> Self {
        Self(Decimal::from(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        Amount(iter.map(|a| a.0).sum())
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

/// Rows may carry the column as text or as a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Text(String),
    Number(serde_json::Number),
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = match AmountRepr::deserialize(deserializer)? {
            AmountRepr::Text(text) => text,
            AmountRepr::Number(number) => number.to_string(),
        };
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_text_and_number() {
        let from_text: Amount = serde_json::from_value(json!("1500.50")).unwrap();
        let from_number: Amount = serde_json::from_value(json!(1500.5)).unwrap();
        assert_eq!(from_text, from_number);
        assert_eq!(from_text.value(), Decimal::new(150050, 2));
    }

    #[test]
    fn test_serializes_as_string() {
        let amount: Amount = "1000".parse().unwrap();
        assert_eq!(serde_json::to_value(amount).unwrap(), json!("1000"));
    }

    #[test]
    fn test_rejects_negative_and_garbage() {
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::Negative(_))));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountError::Malformed(_))));
        assert!(serde_json::from_value::<Amount>(json!(-3)).is_err());
    }

    #[test]
    fn test_sum_has_no_float_drift() {
        let total: Amount = ["0.1", "0.2"].iter().map(|s| s.parse::<Amount>().unwrap()).sum();
        assert_eq!(total, "0.3".parse().unwrap());
    }
}

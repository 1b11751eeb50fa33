use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strictly positive monetary amount.
///
/// This is a wrapper around `rust_decimal::Decimal` so that an amount that made it
/// past validation can never be zero, negative or non-finite. On the wire it is a
/// JSON number.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Amount(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidAmount)
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = ValidationError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// An amount as supplied by the host, before validation.
///
/// Hosts hand over whatever their input field holds, so both JSON numbers and
/// strings are accepted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAmount {
    Number(f64),
    Text(String),
}

impl RawAmount {
    /// Converts the raw value into a decimal, rejecting NaN, infinities and
    /// anything that does not parse as a number.
    pub fn to_decimal(&self) -> Result<Decimal, ValidationError> {
        match self {
            RawAmount::Number(n) if n.is_finite() => {
                Decimal::try_from(*n).map_err(|_| ValidationError::InvalidAmount)
            }
            RawAmount::Number(_) => Err(ValidationError::InvalidAmount),
            RawAmount::Text(s) => {
                let trimmed = s.trim();
                Decimal::from_str(trimmed)
                    .or_else(|_| Decimal::from_scientific(trimmed))
                    .map_err(|_| ValidationError::InvalidAmount)
            }
        }
    }
}

impl From<Decimal> for RawAmount {
    fn from(value: Decimal) -> Self {
        RawAmount::Text(value.to_string())
    }
}

impl From<f64> for RawAmount {
    fn from(value: f64) -> Self {
        RawAmount::Number(value)
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

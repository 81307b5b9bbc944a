//! Monetary amounts using decimal arithmetic.
//!
//! The order API exchanges amounts as plain JSON numbers in the store's single
//! currency, so [`Money`] carries no currency code. Integral amounts are written
//! back as JSON integers and fractional amounts as floats; numbers and numeric
//! strings are both accepted on read.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing [`Money`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// The input is a float that cannot be represented (NaN, infinity).
    #[error("amount is not finite")]
    NotFinite,
}

/// A monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create an amount from a decimal value.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from a whole number of currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying decimal.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply a unit price by a quantity.
    ///
    /// Returns `None` on overflow.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(quantity)).map(Self)
    }

    /// Add two amounts. Returns `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Parse an amount from a string such as `"25000"` or `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Invalid`] if the string is not a decimal number.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        Decimal::from_str(s.trim())
            .map(|d| Self(d.normalize()))
            .map_err(|_| MoneyError::Invalid(s.to_owned()))
    }

    fn from_f64(value: f64) -> Result<Self, MoneyError> {
        if !value.is_finite() {
            return Err(MoneyError::NotFinite);
        }
        Decimal::from_f64(value)
            .map(|d| Self(d.normalize()))
            .ok_or_else(|| MoneyError::Invalid(value.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self::from_units(units)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let units = self.0.fract().is_zero().then(|| self.0.to_i64()).flatten();
        if let Some(units) = units {
            return serializer.serialize_i64(units);
        }
        match self.0.to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&self.0.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Uint(u64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(units) => Ok(Self::from_units(units)),
            Raw::Uint(units) => Ok(Self(Decimal::from(units))),
            Raw::Float(value) => Self::from_f64(value).map_err(serde::de::Error::custom),
            Raw::Text(text) => Self::parse(&text).map_err(serde::de::Error::custom),
        }
    }
}

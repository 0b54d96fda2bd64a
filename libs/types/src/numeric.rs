//! Fixed-point decimal money
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Every stored monetary value is rounded to two fractional digits with
//! HALF_UP rounding (midpoint away from zero) right after each mutation.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Number of fractional digits kept for money.
pub const MONEY_SCALE: u32 = 2;

/// Round a decimal to the money scale (HALF_UP).
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a numeric string, accepting plain and scientific notation.
///
/// Surrounding whitespace is ignored. Finite numbers outside `Decimal`'s
/// range or scale are still numbers: magnitudes below half a cent become
/// zero, larger ones saturate at `Decimal::MAX`/`Decimal::MIN`. Returns
/// `None` only for text that is not a finite number.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .ok()
        .or_else(|| Decimal::from_scientific(trimmed).ok())
        .or_else(|| parse_out_of_range(trimmed))
}

/// Fallback for finite values `Decimal` cannot hold exactly.
fn parse_out_of_range(text: &str) -> Option<Decimal> {
    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value.abs() < 0.005 {
        return Some(Decimal::ZERO);
    }
    Decimal::from_f64(value).or(Some(if value > 0.0 {
        Decimal::MAX
    } else {
        Decimal::MIN
    }))
}

/// Coerce a JSON value holding either a number or a numeric string.
///
/// Numbers go through their shortest textual form so `19.999` stays
/// `19.999` instead of picking up binary floating-point noise.
pub fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

/// Non-negative monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Wrap a decimal, rejecting negative values.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value < Decimal::ZERO {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Build from whole currency units.
    pub fn from_u64(units: u64) -> Self {
        Self(Decimal::from(units))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Lossy conversion used for color ratios only.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// This amount rounded to the money scale.
    pub fn rounded(self) -> Self {
        Self(round_money(self.0))
    }

    /// Add `delta` and round the result to the money scale.
    ///
    /// Saturates at `Decimal::MAX` instead of panicking on overflow.
    pub fn accumulate(self, delta: Amount) -> Self {
        let sum = self.0.checked_add(delta.0).unwrap_or(Decimal::MAX);
        Self(round_money(sum))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())?;
        Self::try_new(value).ok_or_else(|| {
            rust_decimal::Error::ErrorString(format!("negative amount: {}", value))
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

/// Accepts JSON numbers as well as numeric strings, mirroring the wire.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        let value = coerce_decimal(&raw)
            .ok_or_else(|| D::Error::custom(format!("not a number: {}", raw)))?;
        Amount::try_new(value)
            .ok_or_else(|| D::Error::custom(format!("negative amount: {}", value)))
    }
}

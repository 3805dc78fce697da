//! Money conversion module.
//!
//! Contribution amounts are stored internally as `u64` minor units (cents);
//! all conversion between the internal representation and the client-facing
//! decimal string goes through this module. No silent truncation: inputs with
//! more precision than [`DECIMALS`] are rejected.

use std::fmt;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal places carried by the internal representation.
pub const DECIMALS: u32 = 2;

const SCALE: u64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Precision overflow: at most {DECIMALS} decimal places allowed")]
    PrecisionOverflow,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// A monetary amount in minor units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
    utoipa::ToSchema,
)]
#[schema(value_type = u64)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Build from raw minor units (e.g. cents).
    pub const fn from_minor(units: u64) -> Self {
        Self(units)
    }

    pub const fn minor_units(&self) -> u64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Result<Amount, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(MoneyError::Overflow)
    }

    /// Multiply by a participant count. Used once, at round creation.
    pub fn checked_mul(self, count: u64) -> Result<Amount, MoneyError> {
        self.0
            .checked_mul(count)
            .map(Amount)
            .ok_or(MoneyError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_amount(*self))
    }
}

/// Parse a client-provided decimal string into an [`Amount`].
///
/// Rejects empty strings, signs, zero, and anything with more than
/// [`DECIMALS`] decimal places.
pub fn parse_amount(amount_str: &str) -> Result<Amount, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    if amount_str.starts_with('-') || amount_str.starts_with('+') {
        return Err(MoneyError::InvalidAmount);
    }

    let d = Decimal::from_str(amount_str)
        .map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;

    if d.is_sign_negative() || d.is_zero() {
        return Err(MoneyError::InvalidAmount);
    }
    if d.scale() > DECIMALS {
        return Err(MoneyError::PrecisionOverflow);
    }

    let scaled = d
        .checked_mul(Decimal::from(SCALE))
        .ok_or(MoneyError::Overflow)?;
    scaled.to_u64().map(Amount).ok_or(MoneyError::Overflow)
}

/// Format an [`Amount`] as a decimal string with [`DECIMALS`] places.
pub fn format_amount(amount: Amount) -> String {
    let units = amount.minor_units();
    format!("{}.{:02}", units / SCALE, units % SCALE)
}

/// Collection percentage, rounded to the nearest integer.
///
/// `total` is guaranteed positive for rounds created through the engine
/// (participant count >= 2 is enforced at group start); the zero check guards
/// rounds that could exist before settings validation.
pub fn collection_percentage(collected: Amount, total: Amount) -> u8 {
    if total.is_zero() {
        return 0;
    }
    let collected = collected.minor_units() as u128;
    let total = total.minor_units() as u128;
    ((collected * 100 + total / 2) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fractional() {
        assert_eq!(parse_amount("100").unwrap(), Amount::from_minor(10_000));
        assert_eq!(parse_amount("1.5").unwrap(), Amount::from_minor(150));
        assert_eq!(parse_amount("0.01").unwrap(), Amount::from_minor(1));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_amount(""), Err(MoneyError::InvalidFormat("empty string".into())));
        assert_eq!(parse_amount("-5"), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("0"), Err(MoneyError::InvalidAmount));
        assert_eq!(parse_amount("1.555"), Err(MoneyError::PrecisionOverflow));
        assert!(matches!(parse_amount("abc"), Err(MoneyError::InvalidFormat(_))));
    }

    #[test]
    fn test_format_roundtrip() {
        let a = parse_amount("250.75").unwrap();
        assert_eq!(format_amount(a), "250.75");
        assert_eq!(format_amount(Amount::from_minor(5)), "0.05");
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = Amount::from_minor(u64::MAX);
        assert_eq!(a.checked_add(Amount::from_minor(1)), Err(MoneyError::Overflow));
        assert_eq!(a.checked_mul(2), Err(MoneyError::Overflow));
        assert_eq!(
            Amount::from_minor(100).checked_mul(3).unwrap(),
            Amount::from_minor(300)
        );
    }

    #[test]
    fn test_collection_percentage() {
        let total = Amount::from_minor(30_000);
        assert_eq!(collection_percentage(Amount::ZERO, total), 0);
        assert_eq!(collection_percentage(Amount::from_minor(10_000), total), 33);
        assert_eq!(collection_percentage(Amount::from_minor(20_000), total), 67);
        assert_eq!(collection_percentage(total, total), 100);
        // Defensive zero-total path
        assert_eq!(collection_percentage(Amount::ZERO, Amount::ZERO), 0);
    }
}

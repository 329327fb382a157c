//! Decimal money helpers.
//!
//! All amounts are `rust_decimal::Decimal` in the currency's standard unit
//! (dollars, not cents). Binary floating point never touches a price or total.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of fractional digits carried by catalog prices and totals.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount an order total may carry (`NUMERIC(14,2)`).
pub const MAX_TOTAL: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, CURRENCY_SCALE);

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more fractional digits than the currency allows.
    #[error("price must have at most {CURRENCY_SCALE} decimal places")]
    TooPrecise,
    /// The amount exceeds [`Price::MAX`].
    #[error("price cannot exceed {}", Price::MAX)]
    TooLarge,
}

/// A non-negative catalog price.
///
/// Serializes as a decimal string (`"10.99"`) and accepts either a JSON
/// number or a string on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest catalog price (`NUMERIC(12,2)`), `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, CURRENCY_SCALE));

    /// Validate a decimal amount as a price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero and
    /// `PriceError::TooPrecise` for amounts with sub-cent digits and
    /// `PriceError::TooLarge` for amounts above [`Price::MAX`].
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        let normalized = amount.normalize();
        if normalized.scale() > CURRENCY_SCALE {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(with_cents(normalized)))
    }

    /// The underlying amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Present an amount with exactly two fractional digits (`21.98`, `0.00`).
#[must_use]
pub fn with_cents(amount: Decimal) -> Decimal {
    let mut rounded =
        amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CURRENCY_SCALE);
    rounded
}

/// Convert an amount to minor currency units (cents).
///
/// Rounds half away from zero at two decimal places. Returns `None` if the
/// result does not fit in an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    let cents = with_cents(amount).checked_mul(Decimal::ONE_HUNDRED)?;
    i64::try_from(cents.trunc()).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_rejects_negative() {
        assert_eq!(Price::new(dec("-0.01")), Err(PriceError::Negative));
    }

    #[test]
    fn test_price_rejects_sub_cent() {
        assert_eq!(Price::new(dec("1.005")), Err(PriceError::TooPrecise));
        assert!(Price::new(dec("1.500")).is_ok());
    }

    #[test]
    fn test_price_upper_bound() {
        assert_eq!(Price::MAX.amount(), dec("9999999999.99"));
        assert!(Price::new(dec("9999999999.99")).is_ok());
        assert_eq!(Price::new(dec("10000000000")), Err(PriceError::TooLarge));
        assert_eq!(Price::new(dec("100000000000000000000")), Err(PriceError::TooLarge));
        assert!(serde_json::from_str::<Price>("\"100000000000000000000\"").is_err());
    }

    #[test]
    fn test_max_total_matches_column_range() {
        assert_eq!(MAX_TOTAL, dec("999999999999.99"));
    }

    #[test]
    fn test_price_accepts_json_number_and_string() {
        let from_number: Price = serde_json::from_str("10.99").unwrap();
        let from_string: Price = serde_json::from_str("\"10.99\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"10.99\"");
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }

    #[test]
    fn test_with_cents_pads_and_rounds() {
        assert_eq!(with_cents(Decimal::ZERO).to_string(), "0.00");
        assert_eq!(with_cents(dec("5")).to_string(), "5.00");
        assert_eq!(with_cents(dec("2.345")).to_string(), "2.35");
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(dec("21.98")), Some(2198));
        assert_eq!(to_minor_units(dec("0")), Some(0));
        assert_eq!(to_minor_units(dec("0.005")), Some(1));
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }
}

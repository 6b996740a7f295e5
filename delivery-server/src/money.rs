//! Money conversion utilities
//!
//! Amounts are `Decimal` everywhere in the domain and INTEGER cents in
//! storage, so comparisons inside SQL (the conditioned paid-amount update)
//! are exact. Conversions happen only here.

use rust_decimal::prelude::*;
use thiserror::Error;

/// Monetary precision (cents)
pub const DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("amount {0} has more than 2 decimal places")]
    TooPrecise(Decimal),

    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),

    #[error("amount {0} must be greater than zero")]
    NotPositive(Decimal),
}

/// Decimal amount → stored cents
///
/// Fails instead of rounding when the amount carries sub-cent digits.
pub fn to_cents(amount: Decimal) -> Result<i64, MoneyError> {
    if amount.normalize().scale() > DECIMAL_PLACES {
        return Err(MoneyError::TooPrecise(amount));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.to_i64())
        .ok_or(MoneyError::OutOfRange(amount))
}

/// Stored cents → Decimal amount (scale 2)
#[inline]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, DECIMAL_PLACES)
}

/// Validate a caller-supplied payment amount and return it in cents
pub fn validate_amount(amount: Decimal) -> Result<i64, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::NotPositive(amount));
    }
    to_cents(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_to_cents() {
        assert_eq!(to_cents(d("12.34")), Ok(1234));
        assert_eq!(to_cents(d("12.3")), Ok(1230));
        assert_eq!(to_cents(d("12")), Ok(1200));
        assert_eq!(to_cents(d("-1.00")), Ok(-100));
        // trailing zeros beyond cents are fine
        assert_eq!(to_cents(d("0.1000")), Ok(10));
    }

    #[test]
    fn test_to_cents_rejects_sub_cent() {
        assert_eq!(to_cents(d("0.001")), Err(MoneyError::TooPrecise(d("0.001"))));
    }

    #[test]
    fn test_round_trip_is_exact() {
        // 0.1 + 0.2 stays 0.3 through storage
        let sum = d("0.1") + d("0.2");
        assert_eq!(from_cents(to_cents(sum).unwrap()), d("0.3"));
    }

    #[test]
    fn test_validate_amount() {
        assert_eq!(validate_amount(d("150")), Ok(15000));
        assert!(matches!(
            validate_amount(Decimal::ZERO),
            Err(MoneyError::NotPositive(_))
        ));
        assert!(matches!(
            validate_amount(d("-5")),
            Err(MoneyError::NotPositive(_))
        ));
        assert!(matches!(
            validate_amount(d("1.005")),
            Err(MoneyError::TooPrecise(_))
        ));
    }
}

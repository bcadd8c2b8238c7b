//! Monetary rounding
//!
//! Persisted and returned monetary fields carry 2 decimal places,
//! rounded half-up. Intermediate arithmetic (weighted averages,
//! proportional allocation) keeps full `Decimal` precision.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value to 2 decimal places, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a fractional quantity to a whole unit count, half-up.
/// Stock quantities are whole units; recipe requirements can be
/// fractional before rounding.
pub fn round_quantity(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(dec("2.005")), dec("2.01"));
        assert_eq!(round_money(dec("2.004")), dec("2.00"));
        assert_eq!(round_money(dec("2.495")), dec("2.50"));
    }

    #[test]
    fn quantity_rounds_half_up_to_integer() {
        assert_eq!(round_quantity(dec("11.5")), 12);
        assert_eq!(round_quantity(dec("11.4")), 11);
        assert_eq!(round_quantity(dec("12.0")), 12);
    }
}

//! Weighted-average costing tests
//!
//! Property-based and unit tests for:
//! - Weighted average correctness and order independence
//! - Non-negative stock under arbitrary movement sequences
//! - Reversal round-trips

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use lehem_backend::services::costing::{
    apply_incoming, apply_outgoing, reverse_incoming, CostingError, StockPosition,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn empty() -> StockPosition {
    StockPosition {
        quantity: 0,
        avg_price: Decimal::ZERO,
    }
}

const TOLERANCE: &str = "0.000001";

fn close(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < Decimal::from_str(TOLERANCE).unwrap()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Quantities of 1..=1000 whole units
fn qty_strategy() -> impl Strategy<Value = i64> {
    1i64..=1000
}

/// Unit prices of 0.01..=10000.00 with 2 decimal places
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// A sequence of incoming purchases
fn purchases_strategy() -> impl Strategy<Value = Vec<(i64, Decimal)>> {
    prop::collection::vec((qty_strategy(), price_strategy()), 1..12)
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn two_purchases_average_out() {
    // 10 @ 2.00 then 5 @ 3.50 from empty -> 15 @ 2.50
    let p = apply_incoming(empty(), 10, dec("2.00"));
    let p = apply_incoming(p, 5, dec("3.50"));
    assert_eq!(p.quantity, 15);
    assert_eq!(p.avg_price, dec("2.50"));
}

#[test]
fn consumption_keeps_the_cost_basis() {
    let p = apply_incoming(empty(), 20, dec("4.25"));
    let p = apply_outgoing(p, 15).unwrap();
    assert_eq!(p.quantity, 5);
    assert_eq!(p.avg_price, dec("4.25"));
}

#[test]
fn overdraw_is_rejected_in_full() {
    let p = apply_incoming(empty(), 5, dec("1.00"));
    let err = apply_outgoing(p, 6).unwrap_err();
    assert_eq!(
        err,
        CostingError::InsufficientQuantity {
            available: 5,
            requested: 6
        }
    );
}

#[test]
fn purchase_then_reversal_is_a_noop() {
    let before = apply_incoming(empty(), 10, dec("2.00"));
    let after = apply_incoming(before, 5, dec("3.50"));
    let restored = reverse_incoming(after, 5, dec("3.50")).unwrap();
    assert_eq!(restored.quantity, before.quantity);
    assert!(close(restored.avg_price, before.avg_price));
}

#[test]
fn reversing_the_only_purchase_empties_the_position() {
    let p = apply_incoming(empty(), 10, dec("7.77"));
    let restored = reverse_incoming(p, 10, dec("7.77")).unwrap();
    assert_eq!(restored.quantity, 0);
    assert_eq!(restored.avg_price, Decimal::ZERO);
}

#[test]
fn zero_on_zero_incoming_does_not_divide_by_zero() {
    let p = apply_incoming(empty(), 0, dec("5.00"));
    assert_eq!(p.quantity, 0);
    assert_eq!(p.avg_price, Decimal::ZERO);
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// The running average always equals sum(qty * price) / sum(qty).
    #[test]
    fn average_equals_total_value_over_total_quantity(purchases in purchases_strategy()) {
        let mut position = empty();
        for (qty, price) in &purchases {
            position = apply_incoming(position, *qty, *price);
        }

        let total_qty: i64 = purchases.iter().map(|(q, _)| q).sum();
        let total_value: Decimal = purchases
            .iter()
            .map(|(q, p)| Decimal::from(*q) * p)
            .sum();

        prop_assert_eq!(position.quantity, total_qty);
        prop_assert!(close(position.avg_price, total_value / Decimal::from(total_qty)));
    }

    /// The average is independent of purchase order.
    #[test]
    fn average_is_order_independent(purchases in purchases_strategy()) {
        let mut forward = empty();
        for (qty, price) in &purchases {
            forward = apply_incoming(forward, *qty, *price);
        }

        let mut backward = empty();
        for (qty, price) in purchases.iter().rev() {
            backward = apply_incoming(backward, *qty, *price);
        }

        prop_assert_eq!(forward.quantity, backward.quantity);
        prop_assert!(close(forward.avg_price, backward.avg_price));
    }

    /// The average always lies between the cheapest and most expensive
    /// purchase price.
    #[test]
    fn average_is_bounded_by_extremes(purchases in purchases_strategy()) {
        let mut position = empty();
        for (qty, price) in &purchases {
            position = apply_incoming(position, *qty, *price);
        }

        let min = purchases.iter().map(|(_, p)| *p).min().unwrap();
        let max = purchases.iter().map(|(_, p)| *p).max().unwrap();
        let eps = Decimal::from_str(TOLERANCE).unwrap();

        prop_assert!(position.avg_price >= min - eps);
        prop_assert!(position.avg_price <= max + eps);
    }

    /// No outgoing sequence can drive the quantity negative: every step
    /// either succeeds with a non-negative quantity or fails leaving
    /// the position untouched.
    #[test]
    fn stock_never_goes_negative(
        initial_qty in qty_strategy(),
        price in price_strategy(),
        draws in prop::collection::vec(1i64..=500, 1..20),
    ) {
        let mut position = apply_incoming(empty(), initial_qty, price);
        for draw in draws {
            match apply_outgoing(position, draw) {
                Ok(next) => {
                    prop_assert!(next.quantity >= 0);
                    position = next;
                }
                Err(CostingError::InsufficientQuantity { available, requested }) => {
                    prop_assert_eq!(available, position.quantity);
                    prop_assert!(requested > available);
                }
            }
        }
    }

    /// Reversing the most recent purchase restores the prior position.
    #[test]
    fn reversal_round_trips(
        purchases in purchases_strategy(),
        qty in qty_strategy(),
        price in price_strategy(),
    ) {
        let mut before = empty();
        for (q, p) in &purchases {
            before = apply_incoming(before, *q, *p);
        }

        let after = apply_incoming(before, qty, price);
        let restored = reverse_incoming(after, qty, price).unwrap();

        prop_assert_eq!(restored.quantity, before.quantity);
        prop_assert!(close(restored.avg_price, before.avg_price));
    }
}

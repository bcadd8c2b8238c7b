//! Payment allocation tests
//!
//! Property-based and unit tests for:
//! - FIFO / LIFO walk order
//! - Proportional shares, caps, and rounding conservation
//! - Allocation conservation: the allocated total always equals the
//!   paid amount and no invoice is allocated past its balance

use proptest::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use lehem_backend::services::direct_payment::allocate;
use shared::AllocationMethod;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn invoices(balances: &[&str]) -> Vec<(String, Decimal)> {
    balances
        .iter()
        .enumerate()
        .map(|(i, b)| (format!("PINV-{:04}", i + 1), dec(b)))
        .collect()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Outstanding balances of 0.01..=100000.00
fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn balances_strategy() -> impl Strategy<Value = Vec<(String, Decimal)>> {
    prop::collection::vec(balance_strategy(), 1..10).prop_map(|balances| {
        balances
            .into_iter()
            .enumerate()
            .map(|(i, b)| (format!("PINV-{:04}", i + 1), b))
            .collect()
    })
}

fn method_strategy() -> impl Strategy<Value = AllocationMethod> {
    prop_oneof![
        Just(AllocationMethod::Fifo),
        Just(AllocationMethod::Lifo),
        Just(AllocationMethod::Proportional),
    ]
}

/// Balances plus an amount no larger than their sum, in whole cents
fn payment_case_strategy() -> impl Strategy<Value = (Vec<(String, Decimal)>, Decimal)> {
    balances_strategy().prop_flat_map(|balances| {
        let total_cents = balances
            .iter()
            .map(|(_, b)| (*b * Decimal::from(100)).to_i64().unwrap_or(0))
            .sum::<i64>();
        (Just(balances), (1i64..=total_cents).prop_map(|c| Decimal::new(c, 2)))
    })
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn fifo_settles_oldest_invoices_first() {
    // 200,000 then 300,000 outstanding; 350,000 paid FIFO:
    // invoice 1 fully settled, invoice 2 gets the remaining 150,000.
    let plan = allocate(
        dec("350000"),
        &invoices(&["200000", "300000"]),
        AllocationMethod::Fifo,
    );
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].invoice_id, "PINV-0001");
    assert_eq!(plan[0].amount, dec("200000"));
    assert_eq!(plan[1].invoice_id, "PINV-0002");
    assert_eq!(plan[1].amount, dec("150000"));
}

#[test]
fn fifo_stops_once_the_amount_is_exhausted() {
    let plan = allocate(
        dec("50"),
        &invoices(&["100", "200", "300"]),
        AllocationMethod::Fifo,
    );
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].amount, dec("50"));
}

#[test]
fn lifo_walks_the_given_order_too() {
    // The caller passes invoices newest-first for LIFO; the walk is
    // the same min(remaining, balance) loop.
    let plan = allocate(
        dec("350000"),
        &invoices(&["300000", "200000"]),
        AllocationMethod::Lifo,
    );
    assert_eq!(plan[0].amount, dec("300000"));
    assert_eq!(plan[1].amount, dec("50000"));
}

#[test]
fn proportional_shares_follow_the_balance_ratio() {
    let plan = allocate(
        dec("150"),
        &invoices(&["100", "200"]),
        AllocationMethod::Proportional,
    );
    assert_eq!(plan[0].amount, dec("50.00"));
    assert_eq!(plan[1].amount, dec("100.00"));
}

#[test]
fn proportional_rounding_leftover_is_swept() {
    // 100 over three equal balances rounds to 33.33 each, leaving one
    // cent that must land somewhere.
    let inv = invoices(&["100", "100", "100"]);
    let plan = allocate(dec("100"), &inv, AllocationMethod::Proportional);
    let total: Decimal = plan.iter().map(|a| a.amount).sum();
    assert_eq!(total, dec("100"));
    for (a, (_, balance)) in plan.iter().zip(&inv) {
        assert!(a.amount <= *balance);
    }
}

#[test]
fn paying_the_full_outstanding_settles_every_invoice() {
    let inv = invoices(&["120.50", "79.50", "300.00"]);
    for method in [
        AllocationMethod::Fifo,
        AllocationMethod::Lifo,
        AllocationMethod::Proportional,
    ] {
        let plan = allocate(dec("500.00"), &inv, method);
        for (a, (_, balance)) in plan.iter().zip(&inv) {
            assert_eq!(a.amount, *balance, "{:?}", method);
        }
    }
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Conservation: the allocations sum to exactly the paid amount,
    /// and no invoice is allocated beyond its balance.
    #[test]
    fn allocation_conserves_the_amount(
        (balances, amount) in payment_case_strategy(),
        method in method_strategy(),
    ) {
        let plan = allocate(amount, &balances, method);

        let total: Decimal = plan.iter().map(|a| a.amount).sum();
        prop_assert_eq!(total, amount);

        for alloc in &plan {
            let balance = balances
                .iter()
                .find(|(id, _)| id == &alloc.invoice_id)
                .map(|(_, b)| *b)
                .unwrap();
            prop_assert!(alloc.amount > Decimal::ZERO);
            prop_assert!(alloc.amount <= balance);
        }
    }

    /// Each invoice appears at most once in a plan.
    #[test]
    fn no_invoice_is_allocated_twice(
        (balances, amount) in payment_case_strategy(),
        method in method_strategy(),
    ) {
        let plan = allocate(amount, &balances, method);
        let mut ids: Vec<&str> = plan.iter().map(|a| a.invoice_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), plan.len());
    }
}

//! Purchase invoice invariant tests
//!
//! Property-based and unit tests for:
//! - Status derivation from (total_amount, paid_amount)
//! - The paid_amount + balance_due == total_amount invariant under
//!   payment and reversal sequences
//! - Payment type derivation
//! - Line normalization: unit prices rounded to cents exactly once

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use lehem_backend::services::costing::{apply_incoming, reverse_incoming, StockPosition};
use lehem_backend::services::purchase::{validate_lines, PurchaseLineInput};
use shared::{InvoiceStatus, PaymentType};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// In-memory mirror of how the engine moves an invoice's amounts:
/// payments bounded by the balance, reversals subtract what was paid.
struct InvoiceAmounts {
    total: Decimal,
    paid: Decimal,
}

impl InvoiceAmounts {
    fn new(total: Decimal) -> Self {
        Self {
            total,
            paid: Decimal::ZERO,
        }
    }

    fn balance(&self) -> Decimal {
        self.total - self.paid
    }

    fn status(&self) -> InvoiceStatus {
        InvoiceStatus::derive(self.total, self.paid)
    }

    /// Returns false (and changes nothing) when the amount exceeds the
    /// outstanding balance.
    fn pay(&mut self, amount: Decimal) -> bool {
        if amount <= Decimal::ZERO || amount > self.balance() {
            return false;
        }
        self.paid += amount;
        true
    }

    fn reverse(&mut self, amount: Decimal) {
        self.paid -= amount;
    }
}

// ============================================================================
// Property Test Strategies
// ============================================================================

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

// ============================================================================
// Unit tests
// ============================================================================

#[test]
fn status_follows_the_amounts() {
    assert_eq!(
        InvoiceStatus::derive(dec("100"), dec("0")),
        InvoiceStatus::Unpaid
    );
    assert_eq!(
        InvoiceStatus::derive(dec("100"), dec("0.01")),
        InvoiceStatus::Partial
    );
    assert_eq!(
        InvoiceStatus::derive(dec("100"), dec("99.99")),
        InvoiceStatus::Partial
    );
    assert_eq!(
        InvoiceStatus::derive(dec("100"), dec("100")),
        InvoiceStatus::Paid
    );
}

#[test]
fn paying_exactly_the_balance_settles_the_invoice() {
    let mut invoice = InvoiceAmounts::new(dec("250.00"));
    assert!(invoice.pay(dec("250.00")));
    assert_eq!(invoice.balance(), Decimal::ZERO);
    assert_eq!(invoice.status(), InvoiceStatus::Paid);
}

#[test]
fn overpaying_is_rejected_outright() {
    let mut invoice = InvoiceAmounts::new(dec("250.00"));
    assert!(!invoice.pay(dec("250.01")));
    assert_eq!(invoice.paid, Decimal::ZERO);
    assert_eq!(invoice.status(), InvoiceStatus::Unpaid);

    // Also after a partial payment.
    assert!(invoice.pay(dec("200.00")));
    assert!(!invoice.pay(dec("50.01")));
    assert_eq!(invoice.status(), InvoiceStatus::Partial);
}

#[test]
fn reversing_the_only_payment_returns_to_unpaid() {
    let mut invoice = InvoiceAmounts::new(dec("90.00"));
    assert!(invoice.pay(dec("90.00")));
    assert_eq!(invoice.status(), InvoiceStatus::Paid);

    invoice.reverse(dec("90.00"));
    assert_eq!(invoice.paid, Decimal::ZERO);
    assert_eq!(invoice.status(), InvoiceStatus::Unpaid);
}

#[test]
fn payment_type_reflects_the_balance_it_settles() {
    assert_eq!(PaymentType::derive(dec("100"), dec("100")), PaymentType::Full);
    assert_eq!(PaymentType::derive(dec("150"), dec("100")), PaymentType::Full);
    assert_eq!(
        PaymentType::derive(dec("40"), dec("100")),
        PaymentType::Partial
    );
    assert_eq!(PaymentType::derive(dec("0"), dec("100")), PaymentType::UnPaid);
}

// ============================================================================
// Line normalization
// ============================================================================

#[test]
fn unit_prices_are_rounded_to_cents_once() {
    let lines = validate_lines(&[PurchaseLineInput {
        item_id: "ITM-AAAA".to_string(),
        quantity: 3,
        unit_price: dec("2.505"),
    }])
    .unwrap();

    assert_eq!(lines[0].unit_price, dec("2.51"));
}

#[test]
fn normalized_prices_make_receipt_and_reversal_cancel() {
    // A sub-cent input price must hit costing and the stored line with
    // the same figure, so the reversal restores the position exactly.
    let lines = validate_lines(&[PurchaseLineInput {
        item_id: "ITM-AAAA".to_string(),
        quantity: 7,
        unit_price: dec("1.333"),
    }])
    .unwrap();
    let line = &lines[0];

    let before = StockPosition {
        quantity: 10,
        avg_price: dec("2.00"),
    };
    let after = apply_incoming(before, line.quantity, line.unit_price);
    let restored = reverse_incoming(after, line.quantity, line.unit_price).unwrap();

    assert_eq!(restored.quantity, before.quantity);
    assert_eq!(restored.avg_price.round_dp(2), before.avg_price);
}

#[test]
fn empty_and_nonpositive_lines_are_rejected() {
    assert!(validate_lines(&[]).is_err());
    assert!(validate_lines(&[PurchaseLineInput {
        item_id: "ITM-AAAA".to_string(),
        quantity: 0,
        unit_price: dec("1.00"),
    }])
    .is_err());
    assert!(validate_lines(&[PurchaseLineInput {
        item_id: "ITM-AAAA".to_string(),
        quantity: 1,
        unit_price: dec("0"),
    }])
    .is_err());
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// paid + balance == total holds through any accepted payment
    /// sequence, and the status always matches the derivation rule.
    #[test]
    fn balance_invariant_survives_payment_sequences(
        total in amount_strategy(),
        attempts in prop::collection::vec(amount_strategy(), 1..15),
    ) {
        let mut invoice = InvoiceAmounts::new(total);
        for amount in attempts {
            let balance_before = invoice.balance();
            let accepted = invoice.pay(amount);

            // Rejected payments change nothing.
            if !accepted {
                prop_assert_eq!(invoice.balance(), balance_before);
            }

            prop_assert_eq!(invoice.paid + invoice.balance(), invoice.total);
            prop_assert!(invoice.balance() >= Decimal::ZERO);

            let expected = if invoice.paid >= invoice.total {
                InvoiceStatus::Paid
            } else if invoice.paid > Decimal::ZERO {
                InvoiceStatus::Partial
            } else {
                InvoiceStatus::Unpaid
            };
            prop_assert_eq!(invoice.status(), expected);
        }
    }

    /// Paying then reversing any accepted payment restores the
    /// previous amounts and status.
    #[test]
    fn payment_reversal_round_trips(
        total in amount_strategy(),
        amount in amount_strategy(),
    ) {
        let mut invoice = InvoiceAmounts::new(total);
        let paid_before = invoice.paid;
        let status_before = invoice.status();

        if invoice.pay(amount) {
            invoice.reverse(amount);
        }

        prop_assert_eq!(invoice.paid, paid_before);
        prop_assert_eq!(invoice.status(), status_before);
    }
}

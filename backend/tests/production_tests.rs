//! Production and recipe tests
//!
//! Property-based and unit tests for:
//! - Stage monotonicity: DRAFT -> IN_PROCESS -> DONE only
//! - Serial normalization and duplicate detection
//! - Standard cost and feasibility arithmetic

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use lehem_backend::services::production::{max_producible, stock_shortfall};
use lehem_backend::services::recipe::standard_cost;
use shared::{normalize_serial, normalize_serial_list, round_quantity, ProductionStage};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Property Test Strategies
// ============================================================================

fn stage_strategy() -> impl Strategy<Value = ProductionStage> {
    prop_oneof![
        Just(ProductionStage::Draft),
        Just(ProductionStage::InProcess),
        Just(ProductionStage::Done),
    ]
}

fn per_unit_strategy() -> impl Strategy<Value = Decimal> {
    // 0.1 .. 50.0 in tenths
    (1i64..=500).prop_map(|t| Decimal::new(t, 1))
}

// ============================================================================
// Stage machine
// ============================================================================

#[test]
fn stages_advance_in_one_direction_only() {
    assert!(ProductionStage::Draft.can_transition_to(ProductionStage::InProcess));
    assert!(ProductionStage::InProcess.can_transition_to(ProductionStage::Done));

    // No skipping, no going back, no re-entering the same stage.
    assert!(!ProductionStage::Draft.can_transition_to(ProductionStage::Done));
    assert!(!ProductionStage::InProcess.can_transition_to(ProductionStage::InProcess));
    assert!(!ProductionStage::Done.can_transition_to(ProductionStage::Draft));
    assert!(!ProductionStage::Done.can_transition_to(ProductionStage::InProcess));
    assert!(!ProductionStage::Done.can_transition_to(ProductionStage::Done));
}

proptest! {
    /// Any walk through legal transitions visits DRAFT, IN_PROCESS,
    /// DONE in order, each at most once past the start.
    #[test]
    fn legal_walks_are_monotonic(targets in prop::collection::vec(stage_strategy(), 1..10)) {
        let order = |s: ProductionStage| match s {
            ProductionStage::Draft => 0,
            ProductionStage::InProcess => 1,
            ProductionStage::Done => 2,
        };

        let mut stage = ProductionStage::Draft;
        for target in targets {
            if stage.can_transition_to(target) {
                prop_assert_eq!(order(target), order(stage) + 1);
                stage = target;
            }
        }
    }
}

// ============================================================================
// Serial normalization
// ============================================================================

#[test]
fn serials_get_the_prefix_when_missing() {
    assert_eq!(normalize_serial("2201"), "LEH-2201");
    assert_eq!(normalize_serial("LEH-2201"), "LEH-2201");
    assert_eq!(normalize_serial("leh-2201"), "leh-2201");
}

#[test]
fn duplicate_serials_are_caught_case_insensitively() {
    let serials = vec!["LEH-0001".to_string(), "leh-0001".to_string()];
    assert!(normalize_serial_list(&serials).is_err());

    // The duplicate may hide behind normalization too.
    let serials = vec!["0001".to_string(), "LEH-0001".to_string()];
    assert!(normalize_serial_list(&serials).is_err());
}

#[test]
fn valid_serial_lists_come_back_normalized() {
    let serials = vec!["0001".to_string(), "LEH-0002".to_string()];
    let normalized = normalize_serial_list(&serials).unwrap();
    assert_eq!(normalized, vec!["LEH-0001", "LEH-0002"]);
}

#[test]
fn blank_and_empty_serial_lists_are_rejected() {
    assert!(normalize_serial_list(&[]).is_err());
    assert!(normalize_serial_list(&["   ".to_string()]).is_err());
}

// ============================================================================
// Costing arithmetic
// ============================================================================

#[test]
fn standard_cost_of_one_unit() {
    // 4 units of a raw item at avg 90 -> 360 per finished unit
    assert_eq!(standard_cost(&[(dec("4"), dec("90"))]), dec("360.00"));
}

#[test]
fn feasibility_caps_at_the_scarcest_item() {
    // 4 per unit with 10 on hand -> at most floor(10/4) = 2 units
    assert_eq!(max_producible(&[(dec("4"), 10)]), 2);

    // The scarcest item wins.
    assert_eq!(max_producible(&[(dec("4"), 100), (dec("2"), 5)]), 2);
    assert_eq!(max_producible(&[(dec("0.5"), 3)]), 6);
}

#[test]
fn nothing_is_producible_from_empty_stock() {
    assert_eq!(max_producible(&[(dec("1"), 0)]), 0);
    assert_eq!(max_producible(&[]), 0);
}

#[test]
fn required_quantities_round_half_up() {
    // 1.5 per unit for 3 units -> 4.5 -> 5 whole units deducted
    assert_eq!(round_quantity(dec("1.5") * Decimal::from(3)), 5);
    assert_eq!(round_quantity(dec("1.4") * Decimal::from(3)), 4);
}

#[test]
fn fractional_requirement_beyond_stock_is_short() {
    // 1.1 per unit for 4 units requires 4.4; 4 on hand is short even
    // though the deducted quantity would round down to 4.
    let required = dec("1.1") * Decimal::from(4);
    assert_eq!(stock_shortfall(4, required), Some(dec("0.4")));
    assert_eq!(round_quantity(required), 4);

    assert_eq!(stock_shortfall(5, required), None);
}

#[test]
fn exact_coverage_is_not_short() {
    assert_eq!(stock_shortfall(10, dec("10")), None);
    assert_eq!(stock_shortfall(10, dec("10.01")), Some(dec("0.01")));
    assert_eq!(stock_shortfall(0, dec("0")), None);
}

proptest! {
    /// Producing the feasible maximum never requires more of any raw
    /// item than is available; producing one more always does.
    #[test]
    fn max_producible_is_tight(
        lines in prop::collection::vec((per_unit_strategy(), 0i64..=1000), 1..6),
    ) {
        let max = max_producible(&lines);

        for (per_unit, available) in &lines {
            let at_max = per_unit * Decimal::from(max);
            prop_assert!(at_max <= Decimal::from(*available));
        }

        let exceeds = lines.iter().any(|(per_unit, available)| {
            per_unit * Decimal::from(max + 1) > Decimal::from(*available)
        });
        prop_assert!(exceeds);
    }

    /// A quantity is covered exactly when it does not exceed the
    /// feasible maximum.
    #[test]
    fn shortfall_agrees_with_max_producible(
        per_unit in per_unit_strategy(),
        available in 0i64..=1000,
        quantity in 1i64..=100,
    ) {
        let max = max_producible(&[(per_unit, available)]);
        let required = per_unit * Decimal::from(quantity);
        prop_assert_eq!(
            stock_shortfall(available, required).is_none(),
            quantity <= max
        );
    }

    /// Standard cost scales linearly with the per-unit quantities.
    #[test]
    fn standard_cost_is_linear(
        lines in prop::collection::vec((per_unit_strategy(), per_unit_strategy()), 1..6),
    ) {
        let doubled: Vec<(Decimal, Decimal)> = lines
            .iter()
            .map(|(q, p)| (q * Decimal::from(2), *p))
            .collect();
        prop_assert_eq!(
            standard_cost(&doubled),
            (standard_cost(&lines) * Decimal::from(2)).round_dp(2)
        );
    }
}

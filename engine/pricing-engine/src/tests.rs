//! Scenario and property tests for the price solver

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::{solve, FeeKind, FeeRule, PricingError, PricingRequest, INFEASIBLE_REASON};

fn request(
    cost: Decimal,
    shipping: Decimal,
    fees: Vec<FeeRule>,
    margin: Decimal,
) -> PricingRequest {
    PricingRequest::new(cost, shipping, margin).with_fees(fees)
}

mod scenario_tests {
    use super::*;

    #[test]
    fn test_no_fees_thirty_percent_margin() {
        let result = solve(&request(dec!(50), dec!(10), vec![], dec!(0.30))).unwrap();
        assert_eq!(result.total_cost, dec!(60));
        assert_eq!(result.suggested_price, dec!(85.71));
        assert_eq!(result.net_profit, dec!(25.71));
        assert_eq!(result.realized_margin_pct, dec!(30));
        assert_eq!(result.fee_amount, dec!(0));
        assert!(!result.is_infeasible());
    }

    #[test]
    fn test_single_percentage_fee() {
        let fees = vec![FeeRule::percentage(dec!(20))];
        let result = solve(&request(dec!(100), dec!(0), fees, dec!(0.10))).unwrap();
        assert_eq!(result.percentage_fee_total, dec!(0.20));
        assert_eq!(result.percentage_fee_pct, dec!(20));
        assert_eq!(result.suggested_price, dec!(142.86));
        assert_eq!(result.fee_amount, dec!(28.57));
        assert_eq!(result.net_profit, dec!(14.29));
        assert_eq!(result.realized_margin_pct, dec!(10));
    }

    #[test]
    fn test_percentage_fees_over_one_hundred_are_infeasible() {
        let fees = vec![FeeRule::percentage(dec!(50)), FeeRule::percentage(dec!(55))];
        let result = solve(&request(dec!(100), dec!(0), fees, dec!(0.10))).unwrap();
        assert!(result.is_infeasible());
        assert_eq!(result.suggested_price, Decimal::ZERO);
        assert_eq!(result.fee_amount, Decimal::ZERO);
        assert_eq!(result.net_profit, Decimal::ZERO);
        assert_eq!(result.realized_margin_pct, Decimal::ZERO);
        assert_eq!(result.percentage_fee_total, dec!(1.05));

        let infeasibility = result.infeasibility.unwrap();
        assert_eq!(infeasibility.reason, INFEASIBLE_REASON);
        assert_eq!(infeasibility.target_margin, dec!(0.10));
    }

    #[test]
    fn test_false_condition_skips_fee() {
        let fees = vec![FeeRule::fixed(dec!(5)).with_condition("preco > 50")];
        let result = solve(&request(dec!(40), dec!(0), fees, dec!(0))).unwrap();
        assert_eq!(result.suggested_price, dec!(40));
        assert!(result.applied_fees.is_empty());
    }

    #[test]
    fn test_true_condition_applies_fee() {
        let fees = vec![FeeRule::fixed(dec!(5)).with_condition("preco > 30")];
        let result = solve(&request(dec!(40), dec!(0), fees, dec!(0))).unwrap();
        assert_eq!(result.suggested_price, dec!(45));
        assert_eq!(result.fixed_fee_total, dec!(5));
        assert_eq!(result.applied_fees.len(), 1);
    }

    #[test]
    fn test_condition_sees_shipping_in_total_cost() {
        let fees = vec![FeeRule::fixed(dec!(5)).with_condition("preco >= 50")];
        let result = solve(&request(dec!(40), dec!(10), fees, dec!(0))).unwrap();
        assert_eq!(result.suggested_price, dec!(55));
    }

    #[test]
    fn test_margin_and_fees_exactly_one_hundred_is_infeasible() {
        let fees = vec![FeeRule::percentage(dec!(70))];
        let result = solve(&request(dec!(10), dec!(0), fees, dec!(0.30))).unwrap();
        assert!(result.is_infeasible());
    }

    #[test]
    fn test_unparseable_condition_fails_closed() {
        let fees = vec![
            FeeRule::fixed(dec!(100))
                .with_label("injection")
                .with_condition("__import__('os').system('x')"),
            FeeRule::fixed(dec!(7)).with_label("division").with_condition("preco / 0 > 1"),
            FeeRule::fixed(dec!(3)).with_label("plain"),
        ];
        let result = solve(&request(dec!(40), dec!(0), fees, dec!(0))).unwrap();
        assert_eq!(result.suggested_price, dec!(43));
        assert_eq!(result.warnings.len(), 2);
        let labels: Vec<&str> = result.warnings.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["injection", "division"]);
    }

    #[test]
    fn test_deeply_nested_condition_becomes_warning() {
        let deep = format!("{}preco{} > 1", "(".repeat(10_000), ")".repeat(10_000));
        let fees = vec![
            FeeRule::fixed(dec!(9)).with_label("deep").with_condition(deep),
            FeeRule::fixed(dec!(2)).with_label("plain"),
        ];
        let result = solve(&request(dec!(40), dec!(0), fees, dec!(0))).unwrap();
        assert_eq!(result.suggested_price, dec!(42));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].label, "deep");
    }

    #[test]
    fn test_inactive_rules_ignored_even_when_infeasible_otherwise() {
        let fees = vec![FeeRule::percentage(dec!(95)).inactive(), FeeRule::percentage(dec!(10))];
        let result = solve(&request(dec!(90), dec!(0), fees, dec!(0.10))).unwrap();
        assert!(!result.is_infeasible());
        assert_eq!(result.suggested_price, dec!(112.5));
    }

    #[test]
    fn test_breakdown_follows_priority_then_input_order() {
        let fees = vec![
            FeeRule::fixed(dec!(1)).with_label("no priority A"),
            FeeRule::percentage(dec!(5)).with_label("p3").with_priority(3),
            FeeRule::fixed(dec!(2)).with_label("p1").with_priority(1),
            FeeRule::fixed(dec!(1)).with_label("no priority B"),
            FeeRule::percentage(dec!(5)).with_label("p1 second").with_priority(1),
        ];
        let result = solve(&request(dec!(100), dec!(0), fees, dec!(0.2))).unwrap();
        let labels: Vec<&str> = result.applied_fees.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["p1", "p1 second", "p3", "no priority A", "no priority B"]);
    }

    #[test]
    fn test_zero_cost_zero_fees() {
        let result = solve(&request(dec!(0), dec!(0), vec![], dec!(0.5))).unwrap();
        assert_eq!(result.suggested_price, Decimal::ZERO);
        assert_eq!(result.realized_margin_pct, Decimal::ZERO);
    }

    #[test]
    fn test_approaching_boundary_price_grows() {
        let mut last = Decimal::ZERO;
        for points in [dec!(40), dec!(49), dec!(49.9), dec!(49.99), dec!(49.999)] {
            let fees = vec![FeeRule::percentage(points)];
            let result = solve(&request(dec!(10), dec!(0), fees, dec!(0.5))).unwrap();
            assert!(!result.is_infeasible());
            assert!(result.suggested_price > last);
            last = result.suggested_price;
        }
        assert_eq!(last, dec!(1000000));

        let fees = vec![FeeRule::percentage(dec!(50))];
        assert!(solve(&request(dec!(10), dec!(0), fees, dec!(0.5))).unwrap().is_infeasible());
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            solve(&request(dec!(10), dec!(0), vec![], dec!(1.0))),
            Err(PricingError::MarginOutOfRange)
        );
        assert_eq!(
            solve(&request(dec!(10), dec!(-3), vec![], dec!(0.2))),
            Err(PricingError::NegativeShipping)
        );
    }

    #[test]
    fn test_rounding_happens_once_at_the_end() {
        // Three fees of 1/3 of a cent each would vanish if rounded individually
        let third = dec!(0.0033333333);
        let fees = vec![FeeRule::fixed(third), FeeRule::fixed(third), FeeRule::fixed(third)];
        let result = solve(&request(dec!(10), dec!(0), fees, dec!(0))).unwrap();
        assert_eq!(result.fixed_fee_total, dec!(0.01));
        assert_eq!(result.suggested_price, dec!(10.01));
    }
}

fn cents(max: i64) -> impl Strategy<Value = Decimal> {
    (0..=max).prop_map(|c| Decimal::new(c, 2))
}

fn margin() -> impl Strategy<Value = Decimal> {
    (0i64..95).prop_map(|m| Decimal::new(m, 2))
}

fn condition() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        4 => Just(None),
        1 => Just(Some("sempre".to_string())),
        1 => Just(Some("preco > 100".to_string())),
        1 => Just(Some("preco <= 250.5".to_string())),
        1 => Just(Some("10 < valor * 2 < 900".to_string())),
        1 => Just(Some("preco >".to_string())),
    ]
}

fn fee_rule() -> impl Strategy<Value = FeeRule> {
    (
        any::<bool>(),
        cents(3_000),
        proptest::option::of(-3i32..3),
        condition(),
        prop::bool::weighted(0.85),
    )
        .prop_map(|(fixed, amount, priority, condition, active)| FeeRule {
            label: String::new(),
            kind: if fixed { FeeKind::Fixed } else { FeeKind::Percentage },
            amount,
            condition,
            priority,
            active,
        })
}

fn pricing_request() -> impl Strategy<Value = PricingRequest> {
    (cents(100_000), cents(5_000), proptest::collection::vec(fee_rule(), 0..6), margin())
        .prop_map(|(cost, shipping, fees, margin)| request(cost, shipping, fees, margin))
}

proptest! {
    #[test]
    fn prop_solve_is_deterministic(req in pricing_request()) {
        let first = solve(&req).unwrap();
        let second = solve(&req).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn prop_equal_priority_permutations_keep_totals(
        fees in proptest::collection::vec(fee_rule(), 0..6),
        seed in 0usize..720,
        cost in cents(50_000),
        margin in margin(),
    ) {
        let fees: Vec<FeeRule> = fees
            .into_iter()
            .map(|mut f| {
                f.priority = Some(1);
                f
            })
            .collect();
        let mut permuted = fees.clone();
        let len = permuted.len();
        if len > 1 {
            permuted.rotate_left(seed % len);
            permuted.swap(0, seed % len);
        }

        let a = solve(&request(cost, dec!(0), fees, margin)).unwrap();
        let b = solve(&request(cost, dec!(0), permuted, margin)).unwrap();
        prop_assert_eq!(a.fixed_fee_total, b.fixed_fee_total);
        prop_assert_eq!(a.percentage_fee_total, b.percentage_fee_total);
        prop_assert_eq!(a.suggested_price, b.suggested_price);
        prop_assert_eq!(a.net_profit, b.net_profit);
        prop_assert_eq!(a.is_infeasible(), b.is_infeasible());
    }

    #[test]
    fn prop_raising_a_fee_never_lowers_price(
        req in pricing_request(),
        which in any::<prop::sample::Index>(),
        bump in cents(2_000),
    ) {
        prop_assume!(!req.fees.is_empty());
        let before = solve(&req).unwrap();
        prop_assume!(!before.is_infeasible());

        let mut raised = req.clone();
        let i = which.index(raised.fees.len());
        raised.fees[i].amount += bump;
        let after = solve(&raised).unwrap();
        if !after.is_infeasible() {
            prop_assert!(after.suggested_price >= before.suggested_price);
        }
    }

    #[test]
    fn prop_infeasible_exactly_when_margin_and_fees_reach_one(req in pricing_request()) {
        let result = solve(&req).unwrap();
        let reaches_one = req.target_margin + result.percentage_fee_total >= Decimal::ONE;
        prop_assert_eq!(result.is_infeasible(), reaches_one);
        if reaches_one {
            prop_assert_eq!(result.suggested_price, Decimal::ZERO);
        }
    }

    #[test]
    fn prop_zero_fee_zero_margin_identity(cost in cents(1_000_000), shipping in cents(10_000)) {
        let result = solve(&request(cost, shipping, vec![], Decimal::ZERO)).unwrap();
        prop_assert_eq!(result.suggested_price, cost + shipping);
        prop_assert_eq!(result.net_profit, Decimal::ZERO);
    }

    #[test]
    fn prop_rounded_price_reproduces_breakdown(req in pricing_request()) {
        let result = solve(&req).unwrap();
        prop_assume!(!result.is_infeasible());
        prop_assume!(result.suggested_price >= Decimal::ONE);

        let price = result.suggested_price;
        let fee = result.fixed_fee_total + price * result.percentage_fee_total;
        let profit = price - result.total_cost - fee;
        let margin_pct = profit / price * Decimal::ONE_HUNDRED;

        prop_assert!((fee - result.fee_amount).abs() <= dec!(0.01));
        prop_assert!((profit - result.net_profit).abs() <= dec!(0.01));
        let tolerance = Decimal::ONE / price + dec!(0.01);
        prop_assert!((margin_pct - result.realized_margin_pct).abs() <= tolerance);
    }
}

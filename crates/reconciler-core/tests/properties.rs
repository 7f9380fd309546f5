//! Property tests for the reconciliation engine.

use proptest::prelude::*;
use reconciler_core::{reconcile_budget, CategoryPre, CoreError, Money, Rate, ReconcileInput};

fn category_strategy() -> impl Strategy<Value = (i64, i64)> {
    (0i64..=5_000_000, 0i64..=5_000_000)
}

/// Up to 8 categories, O&P up to 50%, tax up to 10%.
fn input_strategy() -> impl Strategy<Value = ReconcileInput> {
    (
        1i64..=100_000_000,
        0u32..=500_000,
        0u32..=100_000,
        prop::collection::vec(category_strategy(), 1..=8),
    )
        .prop_filter("pre-scaling lines must be positive", |(_, _, _, rows)| {
            rows.iter().any(|(m, l)| m + l > 0)
        })
        .prop_map(|(total, o_and_p, tax, rows)| {
            let categories = rows
                .into_iter()
                .enumerate()
                .map(|(i, (m, l))| {
                    CategoryPre::new(
                        format!("cat-{i}"),
                        format!("TRADE {i}"),
                        Money::from_cents(m),
                        Money::from_cents(l),
                    )
                })
                .collect();
            ReconcileInput::new(Money::from_cents(total), categories)
                .with_o_and_p(Rate::from_ppm(o_and_p))
                .with_tax_rate(Rate::from_ppm(tax))
        })
}

/// Tax rates taken from a document's tax total over its materials subtotal.
fn derived_rate_strategy() -> impl Strategy<Value = Rate> {
    (1i64..=100_000_000, 0i64..=100_000).prop_map(|(subtotal, parts_per_million)| {
        let tax = subtotal * parts_per_million / 1_000_000 + parts_per_million % 7;
        Rate::derived(Some(Money::from_cents(tax)), Some(Money::from_cents(subtotal)))
    })
}

proptest! {
    #[test]
    fn prop_conserves_total_when_no_correction(input in input_strategy()) {
        let result = reconcile_budget(&input).unwrap();
        if result.residual_adjustment.is_none() {
            prop_assert_eq!(
                result.subtotal_lines_scaled + result.material_tax + result.o_and_p,
                input.definitive_total
            );
        }
    }

    #[test]
    fn prop_pre_correction_drift_is_bounded(input in input_strategy()) {
        let result = reconcile_budget(&input).unwrap();
        let drift = result
            .residual_adjustment
            .as_ref()
            .map(|adj| adj.amount.cents().abs())
            .unwrap_or(0);
        prop_assert!(drift <= input.categories_pre.len() as i64);
    }

    #[test]
    fn prop_post_correction_mismatch_at_most_one_cent(input in input_strategy()) {
        let result = reconcile_budget(&input).unwrap();
        prop_assert!(result.mismatch(input.definitive_total).cents().abs() <= 1);
    }

    #[test]
    fn prop_components_sum_to_grand_total(input in input_strategy()) {
        let result = reconcile_budget(&input).unwrap();
        let lines: Money = result.categories.iter().map(|c| c.total_scaled).sum();
        prop_assert_eq!(lines, result.subtotal_lines_scaled);
        prop_assert_eq!(
            result.grand_total,
            result.subtotal_lines_scaled + result.material_tax + result.o_and_p
        );
        for c in &result.categories {
            prop_assert_eq!(c.total_scaled, c.material_scaled + c.labor_scaled);
        }
    }

    #[test]
    fn prop_adjustment_targets_first_largest_material(input in input_strategy()) {
        let first = reconcile_budget(&input).unwrap();
        let second = reconcile_budget(&input).unwrap();
        prop_assert_eq!(&first, &second);

        if let Some(adj) = &first.residual_adjustment {
            let index = first
                .categories
                .iter()
                .position(|c| c.id == adj.category_id)
                .unwrap();
            let chosen = first.categories[index].material_scaled - adj.amount;
            for (j, c) in first.categories.iter().enumerate() {
                if j < index {
                    prop_assert!(c.material_scaled < chosen);
                } else if j > index {
                    prop_assert!(c.material_scaled <= chosen);
                }
            }
        }
    }

    #[test]
    fn prop_reported_factor_is_ratio_to_four_places(input in input_strategy()) {
        let result = reconcile_budget(&input).unwrap();
        let material: i64 = input.categories_pre.iter().map(|c| c.material_pre.cents()).sum();
        let labor: i64 = input.categories_pre.iter().map(|c| c.labor_pre.cents()).sum();
        let tax = input.material_tax_rate().as_fraction();

        let ratio = (input.definitive_total - result.o_and_p).cents() as f64
            / ((material + labor) as f64 + tax * material as f64);

        prop_assert!((result.scaling_factor - ratio).abs() <= 0.000_05 + 1e-9);
    }

    #[test]
    fn prop_input_is_never_mutated(input in input_strategy()) {
        let before = input.clone();
        let _ = reconcile_budget(&input);
        prop_assert_eq!(input, before);
    }

    #[test]
    fn prop_zero_lines_are_rejected(total in 1i64..=100_000_000, rows in 0usize..=6) {
        let categories = (0..rows)
            .map(|i| CategoryPre::new(format!("{i}"), "EMPTY", Money::zero(), Money::zero()))
            .collect();
        let input = ReconcileInput::new(Money::from_cents(total), categories);
        prop_assert!(reconcile_budget(&input).unwrap_err().is_invalid_input());
    }

    #[test]
    fn prop_non_positive_total_is_rejected(total in -100_000_000i64..=0, input in input_strategy()) {
        let input = ReconcileInput { definitive_total: Money::from_cents(total), ..input };
        prop_assert!(reconcile_budget(&input).unwrap_err().is_invalid_input());
    }

    #[test]
    fn prop_derived_rates_keep_components_consistent(
        input in input_strategy(),
        rate in derived_rate_strategy(),
    ) {
        let input = input.with_tax_rate(rate);
        let result = reconcile_budget(&input).unwrap();
        let materials: Money = result.categories.iter().map(|c| c.material_scaled).sum();
        prop_assert_eq!(materials.apply_rate(rate), Some(result.material_tax));
        prop_assert_eq!(
            result.grand_total,
            result.subtotal_lines_scaled + result.material_tax + result.o_and_p
        );
    }

    #[test]
    fn prop_huge_amounts_fail_without_panicking(
        total in (i64::MAX / 4)..=i64::MAX,
        rows in prop::collection::vec(((i64::MAX / 8)..=i64::MAX, 0i64..=i64::MAX), 1..=4),
    ) {
        let categories = rows
            .into_iter()
            .enumerate()
            .map(|(i, (m, l))| CategoryPre::new(format!("{i}"), "HUGE", Money::from_cents(m), Money::from_cents(l)))
            .collect();
        let input = ReconcileInput::new(Money::from_cents(total), categories);
        match reconcile_budget(&input) {
            Ok(_) | Err(CoreError::Overflow { .. }) => {}
            Err(other) => prop_assert!(false, "unexpected error: {other}"),
        }
    }
}

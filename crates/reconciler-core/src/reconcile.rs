//! # Reconciliation Engine
//!
//! Scales a set of category estimates onto a single definitive total.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    reconcile_budget(input)                              │
//! │                                                                         │
//! │  1. validate_input ────────► BASE_MATERIAL, BASE_LABOR, BASE_LINES     │
//! │           │                  (InvalidInput if total or lines <= 0)     │
//! │           ▼                                                             │
//! │  2. overhead_and_profit ───► O&P = round(total × o&p%, 2)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  3. ScalingFactor::solve ──► S = (total − O&P)                          │
//! │           │                      / (BASE_LINES + tax × BASE_MATERIAL)  │
//! │           ▼                                                             │
//! │  4. scale_category ────────► material/labor × S, each rounded          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  5. LineSummary::compute ──► subtotal, tax on SCALED materials, grand  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  6. correct_residual ──────► one nudge on the largest material         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  7. ReconcileResult                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single-Pass Residual
//! Rounding material and labor independently leaves up to a cent of drift
//! per category. The corrector moves that drift onto one category's
//! material, then recomputes tax from scratch. Tax depends on materials, so
//! the recomputed grand total can still be off by about `delta × tax_rate`
//! (scenario below: 5000.01 → 4999.99). The corrector runs exactly once and
//! the result is returned as a success.
//!
//! ## Example
//! ```rust
//! use reconciler_core::money::Money;
//! use reconciler_core::reconcile::reconcile_budget;
//! use reconciler_core::types::{CategoryPre, Rate, ReconcileInput};
//!
//! let input = ReconcileInput::new(
//!     Money::from_cents(500_000),
//!     vec![
//!         CategoryPre::new("1", "DRYWALL", Money::from_cents(100_000), Money::from_cents(200_000)),
//!         CategoryPre::new("2", "PAINTING", Money::from_cents(50_000), Money::from_cents(50_000)),
//!     ],
//! )
//! .with_o_and_p(Rate::from_bps(3000))
//! .with_tax_rate(Rate::from_bps(700));
//!
//! let result = reconcile_budget(&input).unwrap();
//! assert_eq!(result.scaling_factor, 0.8526);
//! assert_eq!(result.grand_total, Money::from_cents(499_999));
//! ```

use crate::error::{CoreError, CoreResult};
use crate::money::{div_round_half_up, Money};
use crate::types::{CategoryPre, CategoryScaled, Rate, ReconcileInput, ReconcileResult, ResidualAdjustment};
use crate::validation::{validate_input, BaseTotals};

/// Note attached to every residual adjustment.
pub const RESIDUAL_NOTE: &str = "Minor rounding adjustment applied to Materials to reconcile grand total.";

/// Decimal places of the reported scaling factor.
const REPORTED_FACTOR_SCALE: i128 = 10_000;

fn overflow(stage: &'static str) -> CoreError {
    CoreError::Overflow { stage }
}

const fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.abs()
}

// =============================================================================
// Overhead & Profit
// =============================================================================

/// `round(definitive_total × rate, 2)`.
#[inline]
pub fn overhead_and_profit(definitive_total: Money, rate: Rate) -> CoreResult<Money> {
    definitive_total.apply_rate(rate).ok_or(overflow("O&P"))
}

// =============================================================================
// Scaling Factor
// =============================================================================

/// The budget multiplier, held as an exact ratio in lowest terms.
///
/// Per-category math always uses the exact ratio. Only
/// [`ScalingFactor::reported`] rounds, to 4 decimals, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingFactor {
    numerator: i128,
    denominator: i128,
}

impl ScalingFactor {
    /// Solves `S = (total − O&P) / (BASE_LINES + tax × BASE_MATERIAL)`.
    ///
    /// With `tax = n / d` both sides are multiplied by `d`, so the ratio
    /// stays exact for any rate.
    ///
    /// ## Errors
    /// - [`CoreError::InvalidInput`] when the denominator is not positive,
    ///   which only happens when negative material amounts outweigh the lines
    /// - [`CoreError::Overflow`] when the products leave `i128`
    pub fn solve(
        definitive_total: Money,
        o_and_p: Money,
        base: &BaseTotals,
        tax_rate: Rate,
    ) -> CoreResult<Self> {
        let rate_numerator = tax_rate.numerator() as i128;
        let rate_denominator = tax_rate.denominator() as i128;

        let remaining = definitive_total
            .checked_sub(o_and_p)
            .ok_or(overflow("scaling factor"))?;
        let numerator = remaining.cents() as i128 * rate_denominator;
        let denominator = (base.lines.cents() as i128 * rate_denominator)
            .checked_add(rate_numerator * base.material.cents() as i128)
            .ok_or(overflow("scaling factor"))?;

        if denominator <= 0 {
            return Err(CoreError::InvalidInput {
                definitive_total,
                base_lines: base.lines,
            });
        }

        let divisor = gcd(numerator, denominator).max(1);
        Ok(ScalingFactor {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        })
    }

    /// `round(amount × S, 2)` with the unrounded S. `None` on overflow.
    #[inline]
    pub fn apply(&self, amount: Money) -> Option<Money> {
        amount.mul_ratio(self.numerator, self.denominator)
    }

    /// S rounded to 4 decimals, as an integer count of ten-thousandths.
    pub fn reported_ten_thousandths(&self) -> i64 {
        match self.numerator.checked_mul(REPORTED_FACTOR_SCALE) {
            Some(scaled) => {
                let rounded = div_round_half_up(scaled, self.denominator);
                rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
            }
            None => (self.as_f64() * REPORTED_FACTOR_SCALE as f64).round() as i64,
        }
    }

    /// S rounded to 4 decimals.
    pub fn reported(&self) -> f64 {
        self.reported_ten_thousandths() as f64 / REPORTED_FACTOR_SCALE as f64
    }

    /// S at full precision, as a float. Diagnostics only.
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }
}

// =============================================================================
// Per-Category Scaler
// =============================================================================

/// Scales material and labor independently and sums the rounded parts.
pub fn scale_category(category: &CategoryPre, factor: &ScalingFactor) -> CoreResult<CategoryScaled> {
    let material = factor.apply(category.material_pre).ok_or(overflow("scaled material"))?;
    let labor = factor.apply(category.labor_pre).ok_or(overflow("scaled labor"))?;
    material.checked_add(labor).ok_or(overflow("scaled category total"))?;

    Ok(CategoryScaled::from_pre(category, material, labor))
}

// =============================================================================
// Tax & Totals
// =============================================================================

/// Budget totals derived from the scaled categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSummary {
    /// Σ total_scaled
    pub subtotal_lines_scaled: Money,
    /// round(tax × Σ material_scaled, 2)
    pub material_tax: Money,
    /// subtotal + material_tax + O&P
    pub grand_total: Money,
}

impl LineSummary {
    /// Computes the totals from scratch. Tax is always taken on the scaled
    /// material subtotal.
    pub fn compute(categories: &[CategoryScaled], tax_rate: Rate, o_and_p: Money) -> CoreResult<Self> {
        let subtotal_lines_scaled = Money::checked_sum(categories.iter().map(|c| c.total_scaled))
            .ok_or(overflow("scaled subtotal"))?;
        let materials_scaled = Money::checked_sum(categories.iter().map(|c| c.material_scaled))
            .ok_or(overflow("scaled materials"))?;
        Money::checked_sum(categories.iter().map(|c| c.labor_scaled)).ok_or(overflow("scaled labor"))?;

        let material_tax = materials_scaled.apply_rate(tax_rate).ok_or(overflow("material tax"))?;
        let grand_total = subtotal_lines_scaled
            .checked_add(material_tax)
            .and_then(|total| total.checked_add(o_and_p))
            .ok_or(overflow("grand total"))?;

        Ok(LineSummary {
            subtotal_lines_scaled,
            material_tax,
            grand_total,
        })
    }
}

// =============================================================================
// Residual Corrector
// =============================================================================

/// Index of the category with the largest `material_scaled`.
///
/// Ties go to the first such category in input order. `None` for an
/// empty slice.
pub fn largest_material_index(categories: &[CategoryScaled]) -> Option<usize> {
    let mut largest: Option<(usize, Money)> = None;

    for (index, category) in categories.iter().enumerate() {
        match largest {
            Some((_, max)) if category.material_scaled <= max => {}
            _ => largest = Some((index, category.material_scaled)),
        }
    }

    largest.map(|(index, _)| index)
}

/// Closes a grand-total mismatch with one adjustment.
///
/// When `summary.grand_total != target`, adds `target − grand_total` to the
/// material of the largest-material category and recomputes the summary.
/// Runs once; the recomputed tax may leave a secondary mismatch, which is
/// not corrected. With no categories the mismatch is left as is.
pub fn correct_residual(
    categories: &mut [CategoryScaled],
    target: Money,
    summary: LineSummary,
    tax_rate: Rate,
    o_and_p: Money,
) -> CoreResult<(LineSummary, Option<ResidualAdjustment>)> {
    if summary.grand_total == target {
        return Ok((summary, None));
    }

    let Some(index) = largest_material_index(categories) else {
        return Ok((summary, None));
    };

    let delta = target
        .checked_sub(summary.grand_total)
        .ok_or(overflow("residual"))?;
    let category = &mut categories[index];
    let material = category
        .material_scaled
        .checked_add(delta)
        .filter(|material| material.checked_add(category.labor_scaled).is_some())
        .ok_or(overflow("residual"))?;
    category.set_material_scaled(material);

    let adjustment = ResidualAdjustment {
        amount: delta,
        applied_to_category: category.category.clone(),
        category_id: category.id.clone(),
        note: RESIDUAL_NOTE.to_string(),
    };

    Ok((
        LineSummary::compute(categories, tax_rate, o_and_p)?,
        Some(adjustment),
    ))
}

// =============================================================================
// Engine Entry Point
// =============================================================================

/// Reconciles the categories onto the definitive total.
///
/// Pure: reads `input`, never mutates it, keeps no state between calls.
///
/// ## Errors
/// - [`CoreError::InvalidInput`] when the definitive total or the
///   pre-scaling lines are not positive
/// - [`CoreError::Overflow`] when an amount cannot be carried in cents
///
/// No partial result is returned.
pub fn reconcile_budget(input: &ReconcileInput) -> CoreResult<ReconcileResult> {
    let base = validate_input(input)?;
    let tax_rate = input.material_tax_rate();
    let target = input.definitive_total;

    let o_and_p = overhead_and_profit(target, input.o_and_p_rate())?;
    let factor = ScalingFactor::solve(target, o_and_p, &base, tax_rate)?;

    let mut categories = input
        .categories_pre
        .iter()
        .map(|category| scale_category(category, &factor))
        .collect::<CoreResult<Vec<CategoryScaled>>>()?;

    let summary = LineSummary::compute(&categories, tax_rate, o_and_p)?;
    let (summary, residual_adjustment) =
        correct_residual(&mut categories, target, summary, tax_rate, o_and_p)?;

    Ok(ReconcileResult {
        scaling_factor: factor.reported(),
        o_and_p,
        categories,
        subtotal_lines_scaled: summary.subtotal_lines_scaled,
        material_tax: summary.material_tax,
        grand_total: summary.grand_total,
        residual_adjustment,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(value: i64) -> Money {
        Money::from_cents(value)
    }

    fn category(id: &str, label: &str, material: i64, labor: i64) -> CategoryPre {
        CategoryPre::new(id, label, cents(material), cents(labor))
    }

    fn two_trade_input() -> ReconcileInput {
        ReconcileInput::new(
            cents(500_000),
            vec![
                category("1", "DRYWALL", 100_000, 200_000),
                category("2", "PAINTING", 50_000, 50_000),
            ],
        )
        .with_o_and_p(Rate::from_bps(3000))
        .with_tax_rate(Rate::from_bps(700))
    }

    #[test]
    fn test_single_category_no_tax_no_o_and_p() {
        let input = ReconcileInput::new(cents(130_000), vec![category("1", "ROOFING", 100_000, 0)])
            .with_o_and_p(Rate::zero())
            .with_tax_rate(Rate::zero());

        let result = reconcile_budget(&input).unwrap();

        assert_eq!(result.scaling_factor, 1.3);
        assert_eq!(result.categories[0].material_scaled, cents(130_000));
        assert_eq!(result.grand_total, cents(130_000));
        assert!(result.residual_adjustment.is_none());
    }

    #[test]
    fn test_two_categories_scaled_before_correction() {
        let input = two_trade_input();
        let base = validate_input(&input).unwrap();
        let o_and_p = overhead_and_profit(input.definitive_total, input.o_and_p_rate()).unwrap();
        assert_eq!(o_and_p, cents(150_000));

        let factor = ScalingFactor::solve(input.definitive_total, o_and_p, &base, Rate::from_bps(700)).unwrap();
        assert_eq!(factor.reported_ten_thousandths(), 8526);
        assert!((factor.as_f64() - 0.852_618_757_6).abs() < 1e-9);

        let scaled: Vec<CategoryScaled> = input
            .categories_pre
            .iter()
            .map(|c| scale_category(c, &factor).unwrap())
            .collect();
        assert_eq!(scaled[0].material_scaled, cents(85_262));
        assert_eq!(scaled[0].labor_scaled, cents(170_524));
        assert_eq!(scaled[1].material_scaled, cents(42_631));
        assert_eq!(scaled[1].labor_scaled, cents(42_631));

        let summary = LineSummary::compute(&scaled, Rate::from_bps(700), o_and_p).unwrap();
        assert_eq!(summary.subtotal_lines_scaled, cents(341_048));
        assert_eq!(summary.material_tax, cents(8_953));
        assert_eq!(summary.grand_total, cents(500_001));
    }

    #[test]
    fn test_single_pass_correction_leaves_secondary_mismatch() {
        let result = reconcile_budget(&two_trade_input()).unwrap();

        let adjustment = result.residual_adjustment.as_ref().unwrap();
        assert_eq!(adjustment.amount, cents(-1));
        assert_eq!(adjustment.applied_to_category, "DRYWALL");
        assert_eq!(adjustment.category_id, "1");
        assert_eq!(adjustment.note, "Minor rounding adjustment applied to Materials to reconcile grand total.");

        assert_eq!(result.categories[0].material_scaled, cents(85_261));
        assert_eq!(result.categories[0].total_scaled, cents(255_785));
        assert_eq!(result.subtotal_lines_scaled, cents(341_047));
        assert_eq!(result.material_tax, cents(8_952));
        assert_eq!(result.o_and_p, cents(150_000));
        // Tax moved with the adjusted material: 5000.01 → 4999.99, not 5000.00.
        assert_eq!(result.grand_total, cents(499_999));
        assert_eq!(result.scaling_factor, 0.8526);
    }

    #[test]
    fn test_per_category_math_uses_unrounded_factor() {
        let result = reconcile_budget(&two_trade_input()).unwrap();
        // 2000.00 × 0.8526 would be 1705.20.
        assert_eq!(result.categories[0].labor_scaled, cents(170_524));
    }

    #[test]
    fn test_empty_categories_is_invalid() {
        let input = ReconcileInput::new(cents(100_000), vec![]);
        let err = reconcile_budget(&input).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_zero_definitive_total_is_invalid() {
        let input = ReconcileInput::new(Money::zero(), vec![category("1", "DRYWALL", 100_000, 0)]);
        assert!(matches!(
            reconcile_budget(&input),
            Err(CoreError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_residual_tie_goes_to_first_in_input_order() {
        let input = ReconcileInput::new(
            cents(100_000),
            vec![
                category("a", "DEMOLITION", 50_000, 10_000),
                category("b", "ELECTRICAL", 30_000, 30_000),
                category("c", "FLOORING", 50_000, 20_000),
            ],
        );

        let result = reconcile_budget(&input).unwrap();

        // DEMOLITION and FLOORING both scale to 175.79 material.
        let adjustment = result.residual_adjustment.unwrap();
        assert_eq!(adjustment.amount, cents(1));
        assert_eq!(adjustment.category_id, "a");
        assert_eq!(result.categories[0].material_scaled, cents(17_580));
        assert_eq!(result.categories[2].material_scaled, cents(17_579));
        assert_eq!(result.grand_total, cents(100_000));
    }

    #[test]
    fn test_residual_without_tax_closes_exactly() {
        let input = ReconcileInput::new(
            cents(100_000),
            vec![
                category("1", "PLUMBING", 10_000, 0),
                category("2", "CARPENTRY", 10_000, 0),
                category("3", "INSULATION", 10_000, 0),
            ],
        )
        .with_o_and_p(Rate::zero())
        .with_tax_rate(Rate::zero());

        let result = reconcile_budget(&input).unwrap();

        assert_eq!(result.residual_adjustment.unwrap().amount, cents(1));
        assert_eq!(result.categories[0].material_scaled, cents(33_334));
        assert_eq!(result.categories[1].material_scaled, cents(33_333));
        assert_eq!(result.grand_total, cents(100_000));
    }

    #[test]
    fn test_largest_material_index() {
        let pre = category("x", "X", 0, 0);
        let rows: Vec<CategoryScaled> = [5, 9, 9, 1]
            .iter()
            .map(|m| CategoryScaled::from_pre(&pre, cents(*m), Money::zero()))
            .collect();

        assert_eq!(largest_material_index(&rows), Some(1));
        assert_eq!(largest_material_index(&[]), None);
    }

    #[test]
    fn test_correct_residual_with_no_categories_is_noop() {
        let summary = LineSummary {
            subtotal_lines_scaled: Money::zero(),
            material_tax: Money::zero(),
            grand_total: cents(10),
        };
        let (after, adjustment) =
            correct_residual(&mut [], cents(11), summary, Rate::zero(), Money::zero()).unwrap();
        assert_eq!(after, summary);
        assert!(adjustment.is_none());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let input = two_trade_input();
        let before = input.clone();
        let _ = reconcile_budget(&input).unwrap();
        assert_eq!(input, before);
    }

    #[test]
    fn test_compounding_re_reconciliation() {
        let first = reconcile_budget(&two_trade_input()).unwrap();

        let again = ReconcileInput::new(
            cents(500_000),
            first.categories.iter().map(CategoryScaled::to_compounding_pre).collect(),
        )
        .with_o_and_p(Rate::from_bps(2500))
        .with_tax_rate(Rate::from_bps(700));

        let second = reconcile_budget(&again).unwrap();

        // The second factor scales the first pass's output, not the raw estimate.
        assert_eq!(second.categories[0].material_pre, cents(85_261));
        assert_eq!(second.scaling_factor, 1.0714);
        assert_eq!(second.categories[0].material_scaled, cents(91_351));
        assert_eq!(second.categories[0].labor_scaled, cents(182_705));
        assert_eq!(second.grand_total, cents(500_000));
        assert!(second.residual_adjustment.is_none());
    }

    #[test]
    fn test_derived_tax_rate_is_not_rounded() {
        // 7000 / 105000 = 1/15. Rounded to 66_667 ppm, material would land on 10_312_497.
        let input = ReconcileInput::new(cents(11_000_000), vec![category("1", "ROOFING", 10_000_000, 0)])
            .with_o_and_p(Rate::zero())
            .with_tax_rate(Rate::derived(Some(cents(7_000)), Some(cents(105_000))));

        let result = reconcile_budget(&input).unwrap();

        assert_eq!(result.categories[0].material_scaled, cents(10_312_500));
        assert_eq!(result.material_tax, cents(687_500));
        assert_eq!(result.grand_total, cents(11_000_000));
        assert!(result.residual_adjustment.is_none());
    }

    #[test]
    fn test_tax_rate_from_json_fraction_matches_exact_ratio() {
        let input: ReconcileInput = serde_json::from_value(serde_json::json!({
            "definitiveTotal": 11_000_000,
            "oAndPPercent": 0.0,
            "taxRate": 7000.0 / 105000.0,
            "categoriesPre": [
                { "id": "1", "category": "ROOFING", "materialPre": 10_000_000, "laborPre": 0 }
            ]
        }))
        .unwrap();

        let result = reconcile_budget(&input).unwrap();

        assert_eq!(result.categories[0].material_scaled, cents(10_312_500));
        assert_eq!(result.material_tax, cents(687_500));
    }

    #[test]
    fn test_scaling_factor_is_reduced() {
        let base = BaseTotals {
            material: cents(10_000_000),
            labor: Money::zero(),
            lines: cents(10_000_000),
        };
        let factor = ScalingFactor::solve(cents(11_000_000), Money::zero(), &base, Rate::from_ratio(1, 15).unwrap())
            .unwrap();
        assert_eq!(factor, ScalingFactor { numerator: 33, denominator: 32 });
    }

    #[test]
    fn test_huge_lines_overflow_is_an_error() {
        let half = i64::MAX / 2;
        let input = ReconcileInput::new(
            cents(100_000),
            vec![category("1", "DRYWALL", half, half), category("2", "PAINTING", half, half)],
        );

        let err = reconcile_budget(&input).unwrap_err();
        assert!(matches!(err, CoreError::Overflow { .. }));
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn test_huge_definitive_total_does_not_panic() {
        let input = ReconcileInput::new(cents(i64::MAX), vec![category("1", "DRYWALL", i64::MAX / 2, 1)]);
        assert!(matches!(
            reconcile_budget(&input),
            Ok(_) | Err(CoreError::Overflow { .. })
        ));

        // Each row scales to 2^62 cents; their sum does not fit.
        let input = ReconcileInput::new(
            cents(i64::MAX),
            vec![category("1", "DRYWALL", 1, 0), category("2", "PAINTING", 1, 0)],
        )
        .with_o_and_p(Rate::zero())
        .with_tax_rate(Rate::zero());
        assert!(matches!(reconcile_budget(&input), Err(CoreError::Overflow { .. })));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let input = two_trade_input();
        assert_eq!(reconcile_budget(&input).unwrap(), reconcile_budget(&input).unwrap());
    }
}

//! # Domain Types
//!
//! The data model of the reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │  CategoryPre    │   │ CategoryScaled  │   │  ReconcileInput     │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id, category   │──►│  ...pre fields  │   │  definitive_total   │   │
//! │  │  material_pre   │   │  material_scaled│   │  o_and_p_percent    │   │
//! │  │  labor_pre      │   │  labor_scaled   │   │  tax_rate           │   │
//! │  └─────────────────┘   │  total_scaled   │   │  categories_pre     │   │
//! │                        └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────────────────────────────┐     │
//! │  │      Rate       │   │           ReconcileResult               │     │
//! │  │  ─────────────  │   │  scaling_factor, o_and_p, categories,   │     │
//! │  │  num / den      │   │  subtotal_lines_scaled, material_tax,   │     │
//! │  │  7/100 = 7%     │   │  grand_total, residual_adjustment       │     │
//! │  └─────────────────┘   └─────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All types serialize with camelCase keys. Money fields serialize as integer
//! cents, rates as plain fractions (`0.07`).

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Rate
// =============================================================================

/// A non-negative fraction held exactly as `numerator / denominator`.
///
/// ## Exactness
/// A tax rate derived from a document (`tax_total / materials_subtotal`,
/// e.g. 7000/105000) has no finite decimal form. Rounding it to any fixed
/// scale moves cents between material and tax on large budgets. Only the
/// final product is rounded.
///
/// - Always stored in lowest terms, so derived equality is exact equality
/// - `denominator > 0`
/// - Rates read from JSON or TOML fractions are captured to 1e-12
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Rate {
    numerator: u64,
    denominator: u64,
}

const fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Rate {
    /// Resolution used when a rate arrives as an `f64` fraction.
    pub const FRACTION_SCALE: u64 = 1_000_000_000_000;

    /// Default overhead & profit: 30% of the definitive total.
    pub const DEFAULT_O_AND_P: Rate = Rate::reduced(3, 10);

    /// Default material sales tax: 7%.
    pub const DEFAULT_TAX: Rate = Rate::reduced(7, 100);

    /// 100%.
    pub const ONE: Rate = Rate::reduced(1, 1);

    /// Lowest terms of `numerator / denominator`. `denominator` must be > 0.
    const fn reduced(numerator: u64, denominator: u64) -> Self {
        let divisor = gcd(numerator, denominator);
        Rate {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
        }
    }

    /// Creates a rate from an exact ratio. `None` for a zero denominator.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::types::Rate;
    ///
    /// let rate = Rate::from_ratio(7_000, 105_000).unwrap();
    /// assert_eq!((rate.numerator(), rate.denominator()), (1, 15));
    /// assert!(Rate::from_ratio(1, 0).is_none());
    /// ```
    pub const fn from_ratio(numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            None
        } else {
            Some(Rate::reduced(numerator, denominator))
        }
    }

    /// Creates a rate from parts per million (70_000 = 7%).
    #[inline]
    pub const fn from_ppm(ppm: u32) -> Self {
        Rate::reduced(ppm as u64, 1_000_000)
    }

    /// Creates a rate from basis points (825 = 8.25%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate::reduced(bps as u64, 10_000)
    }

    /// Creates a rate from a fraction (`0.07` = 7%), rounded to the nearest
    /// [`Rate::FRACTION_SCALE`]th.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::types::Rate;
    ///
    /// assert_eq!(Rate::from_fraction(0.30).unwrap(), Rate::DEFAULT_O_AND_P);
    /// assert!(Rate::from_fraction(-0.01).is_err());
    /// ```
    pub fn from_fraction(fraction: f64) -> Result<Self, ValidationError> {
        let scaled = (fraction * Self::FRACTION_SCALE as f64).round();
        if !scaled.is_finite() || scaled < 0.0 || scaled >= u64::MAX as f64 {
            return Err(ValidationError::InvalidFormat {
                field: "rate".to_string(),
                reason: format!("{fraction} is not a non-negative fraction"),
            });
        }
        Ok(Rate::reduced(scaled as u64, Self::FRACTION_SCALE))
    }

    /// Derives the material sales tax rate from a document's tax total and
    /// materials subtotal, exactly. Falls back to [`Rate::DEFAULT_TAX`] when
    /// either is missing, the tax is negative or the subtotal is not positive.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::money::Money;
    /// use reconciler_core::types::Rate;
    ///
    /// let derived = Rate::derived(Some(Money::from_cents(8_250)), Some(Money::from_cents(100_000)));
    /// assert_eq!(derived, Rate::from_bps(825));
    /// assert_eq!(Rate::derived(None, Some(Money::from_cents(100_000))), Rate::DEFAULT_TAX);
    /// ```
    pub fn derived(tax_total: Option<Money>, materials_subtotal: Option<Money>) -> Rate {
        match (tax_total, materials_subtotal) {
            (Some(tax), Some(subtotal)) if subtotal.is_positive() && !tax.is_negative() => {
                Rate::reduced(tax.cents() as u64, subtotal.cents() as u64)
            }
            _ => Self::DEFAULT_TAX,
        }
    }

    #[inline]
    pub const fn numerator(&self) -> u64 {
        self.numerator
    }

    #[inline]
    pub const fn denominator(&self) -> u64 {
        self.denominator
    }

    /// Returns the rate as a fraction (for display and JSON only).
    #[inline]
    pub fn as_fraction(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    #[inline]
    pub const fn zero() -> Self {
        Rate {
            numerator: 0,
            denominator: 1,
        }
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.numerator == 0
    }
}

impl Ord for Rate {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let left = self.numerator as u128 * other.denominator as u128;
        let right = other.numerator as u128 * self.denominator as u128;
        left.cmp(&right)
    }
}

impl PartialOrd for Rate {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<f64> for Rate {
    type Error = ValidationError;

    fn try_from(fraction: f64) -> Result<Self, Self::Error> {
        Rate::from_fraction(fraction)
    }
}

impl From<Rate> for f64 {
    fn from(rate: Rate) -> f64 {
        rate.as_fraction()
    }
}

/// Displays as a percentage with two decimals: `7.00%`.
impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.as_fraction() * 100.0)
    }
}

// =============================================================================
// Categories
// =============================================================================

/// One trade's unscaled estimate, already split into material and labor by
/// the extraction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPre {
    /// Stable row identifier.
    pub id: String,

    /// Trade label, e.g. "DRYWALL".
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description_summary: Option<String>,

    #[serde(default)]
    pub material_pre: Money,

    #[serde(default)]
    pub labor_pre: Money,
}

impl CategoryPre {
    /// Creates a category with no description.
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        material_pre: Money,
        labor_pre: Money,
    ) -> Self {
        CategoryPre {
            id: id.into(),
            category: category.into(),
            description_summary: None,
            material_pre,
            labor_pre,
        }
    }

    /// Adds a human summary of the trade's scope.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description_summary = Some(description.into());
        self
    }

    /// Material plus labor before scaling.
    #[inline]
    pub fn total_pre(&self) -> Money {
        self.material_pre + self.labor_pre
    }
}

/// A category after scaling.
///
/// `total_scaled` is the sum of the two already-rounded fields, never a
/// rounded sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScaled {
    pub id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub description_summary: Option<String>,
    pub material_pre: Money,
    pub labor_pre: Money,
    pub material_scaled: Money,
    pub labor_scaled: Money,
    pub total_scaled: Money,
}

impl CategoryScaled {
    /// Builds a scaled row from its pre-scaling source and the rounded
    /// material and labor figures.
    pub fn from_pre(pre: &CategoryPre, material_scaled: Money, labor_scaled: Money) -> Self {
        CategoryScaled {
            id: pre.id.clone(),
            category: pre.category.clone(),
            description_summary: pre.description_summary.clone(),
            material_pre: pre.material_pre,
            labor_pre: pre.labor_pre,
            material_scaled,
            labor_scaled,
            total_scaled: material_scaled + labor_scaled,
        }
    }

    /// Replaces the scaled material figure and keeps `total_scaled` in step.
    pub fn set_material_scaled(&mut self, material_scaled: Money) {
        self.material_scaled = material_scaled;
        self.total_scaled = self.material_scaled + self.labor_scaled;
    }

    /// Replaces the scaled labor figure and keeps `total_scaled` in step.
    pub fn set_labor_scaled(&mut self, labor_scaled: Money) {
        self.labor_scaled = labor_scaled;
        self.total_scaled = self.material_scaled + self.labor_scaled;
    }

    /// The row as new pre-scaling input, treating the scaled figures as
    /// ground truth.
    ///
    /// This is the compounding re-reconciliation contract: reconciling the
    /// result again scales on top of the previous factor instead of
    /// starting over from the raw estimate.
    pub fn to_compounding_pre(&self) -> CategoryPre {
        CategoryPre {
            id: self.id.clone(),
            category: self.category.clone(),
            description_summary: self.description_summary.clone(),
            material_pre: self.material_scaled,
            labor_pre: self.labor_scaled,
        }
    }

    /// The original pre-scaling row this category was scaled from.
    pub fn to_baseline_pre(&self) -> CategoryPre {
        CategoryPre {
            id: self.id.clone(),
            category: self.category.clone(),
            description_summary: self.description_summary.clone(),
            material_pre: self.material_pre,
            labor_pre: self.labor_pre,
        }
    }
}

// =============================================================================
// Engine Input / Output
// =============================================================================

/// Everything the engine needs for one reconciliation.
///
/// Rates left as `None` fall back to [`Rate::DEFAULT_O_AND_P`] and
/// [`Rate::DEFAULT_TAX`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileInput {
    /// The single authoritative grand total.
    pub definitive_total: Money,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<f64>", optional)]
    pub o_and_p_percent: Option<Rate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<f64>", optional)]
    pub tax_rate: Option<Rate>,

    /// Input order only matters as the residual tie-break key.
    #[serde(default)]
    pub categories_pre: Vec<CategoryPre>,
}

impl ReconcileInput {
    /// Creates an input with default O&P and tax rates.
    pub fn new(definitive_total: Money, categories_pre: Vec<CategoryPre>) -> Self {
        ReconcileInput {
            definitive_total,
            o_and_p_percent: None,
            tax_rate: None,
            categories_pre,
        }
    }

    pub fn with_o_and_p(mut self, rate: Rate) -> Self {
        self.o_and_p_percent = Some(rate);
        self
    }

    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = Some(rate);
        self
    }

    /// O&P rate in effect for this input.
    #[inline]
    pub fn o_and_p_rate(&self) -> Rate {
        self.o_and_p_percent.unwrap_or(Rate::DEFAULT_O_AND_P)
    }

    /// Material sales tax rate in effect for this input.
    #[inline]
    pub fn material_tax_rate(&self) -> Rate {
        self.tax_rate.unwrap_or(Rate::DEFAULT_TAX)
    }
}

/// Record of the single-pass rounding correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResidualAdjustment {
    /// Amount added to the category's scaled material (usually ±$0.01).
    pub amount: Money,

    /// Label of the adjusted category.
    pub applied_to_category: String,

    /// Id of the adjusted category.
    pub category_id: String,

    pub note: String,
}

/// The reconciled budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResult {
    /// The scaling factor rounded to 4 decimals. Reporting only.
    pub scaling_factor: f64,
    pub o_and_p: Money,
    pub categories: Vec<CategoryScaled>,
    pub subtotal_lines_scaled: Money,
    pub material_tax: Money,
    pub grand_total: Money,
    pub residual_adjustment: Option<ResidualAdjustment>,
}

impl ReconcileResult {
    /// The placeholder shown when the categories cannot be reconciled
    /// (for example, every row was deleted): O&P computed from the target
    /// alone, zero lines, zero tax.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::money::Money;
    /// use reconciler_core::types::{Rate, ReconcileResult};
    ///
    /// let fallback =
    ///     ReconcileResult::degraded(Money::from_cents(500_000), Rate::DEFAULT_O_AND_P, vec![]).unwrap();
    /// assert_eq!(fallback.grand_total, Money::from_cents(150_000));
    /// assert_eq!(fallback.scaling_factor, 0.0);
    /// ```
    pub fn degraded(
        definitive_total: Money,
        o_and_p_rate: Rate,
        categories: Vec<CategoryScaled>,
    ) -> CoreResult<Self> {
        let o_and_p = definitive_total
            .apply_rate(o_and_p_rate)
            .ok_or(CoreError::Overflow { stage: "O&P" })?;
        Ok(ReconcileResult {
            scaling_factor: 0.0,
            o_and_p,
            categories,
            subtotal_lines_scaled: Money::zero(),
            material_tax: Money::zero(),
            grand_total: o_and_p,
            residual_adjustment: None,
        })
    }

    /// Σ material_scaled.
    pub fn materials_scaled(&self) -> Money {
        self.categories.iter().map(|c| c.material_scaled).sum()
    }

    /// Σ labor_scaled.
    pub fn labor_scaled(&self) -> Money {
        self.categories.iter().map(|c| c.labor_scaled).sum()
    }

    /// Signed gap between the grand total and the target.
    #[inline]
    pub fn mismatch(&self, definitive_total: Money) -> Money {
        self.grand_total - definitive_total
    }

    /// True when the grand total is within `tolerance` of the target.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::money::Money;
    /// use reconciler_core::types::{Rate, ReconcileResult};
    ///
    /// let result = ReconcileResult::degraded(Money::from_cents(100), Rate::zero(), vec![]).unwrap();
    /// assert!(!result.is_reconciled(Money::from_cents(100), Money::zero()));
    /// ```
    pub fn is_reconciled(&self, definitive_total: Money, tolerance: Money) -> bool {
        self.mismatch(definitive_total).abs() <= tolerance.abs()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_bps_and_fraction() {
        assert_eq!(Rate::from_bps(825), Rate::from_ppm(82_500));
        assert_eq!(Rate::from_fraction(0.07).unwrap(), Rate::DEFAULT_TAX);
        assert_eq!(Rate::from_fraction(0.0825).unwrap(), Rate::from_bps(825));
        assert!(Rate::from_fraction(f64::NAN).is_err());
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(Rate::DEFAULT_TAX.to_string(), "7.00%");
        assert_eq!(Rate::from_bps(825).to_string(), "8.25%");
    }

    #[test]
    fn test_derived_tax_rate_is_exact() {
        let rate = Rate::derived(Some(Money::from_cents(700_000)), Some(Money::from_cents(10_500_000)));
        assert_eq!(rate, Rate::from_ratio(1, 15).unwrap());
        assert_eq!(rate.denominator(), 15);
        assert_ne!(rate, Rate::from_ppm(66_667));
    }

    #[test]
    fn test_fraction_keeps_twelve_places() {
        let rate = Rate::from_fraction(7_000.0 / 105_000.0).unwrap();
        assert_eq!(rate, Rate::from_ratio(66_666_666_667, Rate::FRACTION_SCALE).unwrap());
        assert_eq!(Rate::from_fraction(0.0825).unwrap(), Rate::from_bps(825));
    }

    #[test]
    fn test_skipped_fields_are_optional_in_bindings() {
        let category = CategoryPre::decl();
        assert!(category.contains("descriptionSummary?: string"), "{category}");

        let input = ReconcileInput::decl();
        assert!(input.contains("oAndPPercent?: number"), "{input}");
        assert!(input.contains("taxRate?: number"), "{input}");
    }

    #[test]
    fn test_rate_ordering_compares_values() {
        assert!(Rate::from_ratio(1, 15).unwrap() < Rate::DEFAULT_TAX);
        assert!(Rate::from_ppm(1_000_001) > Rate::ONE);
        assert_eq!(Rate::from_bps(10_000), Rate::ONE);
    }

    #[test]
    fn test_derived_tax_rate_falls_back_on_zero_subtotal() {
        let rate = Rate::derived(Some(Money::from_cents(500)), Some(Money::zero()));
        assert_eq!(rate, Rate::DEFAULT_TAX);
    }

    #[test]
    fn test_input_defaults() {
        let input = ReconcileInput::new(Money::from_cents(100), vec![]);
        assert_eq!(input.o_and_p_rate(), Rate::DEFAULT_O_AND_P);
        assert_eq!(input.material_tax_rate(), Rate::DEFAULT_TAX);

        let input = input.with_o_and_p(Rate::zero()).with_tax_rate(Rate::from_bps(825));
        assert_eq!(input.o_and_p_rate(), Rate::zero());
        assert_eq!(input.material_tax_rate(), Rate::from_bps(825));
    }

    #[test]
    fn test_input_json_shape() {
        let json = r#"{
            "definitiveTotal": 500000,
            "oAndPPercent": 0.3,
            "categoriesPre": [
                {"id": "1", "category": "DRYWALL", "materialPre": 100000, "laborPre": 200000}
            ]
        }"#;
        let input: ReconcileInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.definitive_total, Money::from_cents(500_000));
        assert_eq!(input.o_and_p_percent, Some(Rate::DEFAULT_O_AND_P));
        assert_eq!(input.tax_rate, None);
        assert_eq!(input.categories_pre[0].total_pre(), Money::from_cents(300_000));
    }

    #[test]
    fn test_scaled_setters_keep_total_in_step() {
        let pre = CategoryPre::new("1", "PAINTING", Money::from_cents(100), Money::from_cents(200));
        let mut scaled = CategoryScaled::from_pre(&pre, Money::from_cents(130), Money::from_cents(260));
        assert_eq!(scaled.total_scaled, Money::from_cents(390));

        scaled.set_material_scaled(Money::from_cents(129));
        assert_eq!(scaled.total_scaled, Money::from_cents(389));
        scaled.set_labor_scaled(Money::zero());
        assert_eq!(scaled.total_scaled, Money::from_cents(129));
    }

    #[test]
    fn test_compounding_pre_uses_scaled_figures() {
        let pre = CategoryPre::new("1", "FLOORING", Money::from_cents(100), Money::from_cents(200));
        let scaled = CategoryScaled::from_pre(&pre, Money::from_cents(130), Money::from_cents(260));

        let again = scaled.to_compounding_pre();
        assert_eq!(again.material_pre, Money::from_cents(130));
        assert_eq!(again.labor_pre, Money::from_cents(260));
        assert_eq!(scaled.to_baseline_pre(), pre);
    }

    #[test]
    fn test_degraded_result() {
        let result =
            ReconcileResult::degraded(Money::from_cents(500_000), Rate::DEFAULT_O_AND_P, vec![]).unwrap();
        assert_eq!(result.o_and_p, Money::from_cents(150_000));
        assert_eq!(result.grand_total, Money::from_cents(150_000));
        assert!(result.residual_adjustment.is_none());
    }
}

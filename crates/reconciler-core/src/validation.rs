//! # Validation Module
//!
//! The engine's input validator plus field validators for edited budgets.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Editing session (reconciler-session)                         │
//! │  ├── validate_category_label / validate_category_amount                │
//! │  └── validate_rate on config and O&P edits                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine entry                                                 │
//! │  └── validate_input: the ONLY failure the engine defines               │
//! │      definitive_total <= 0  OR  base lines <= 0  →  InvalidInput       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use reconciler_core::money::Money;
//! use reconciler_core::types::{CategoryPre, ReconcileInput};
//! use reconciler_core::validation::validate_input;
//!
//! let input = ReconcileInput::new(
//!     Money::from_cents(130_000),
//!     vec![CategoryPre::new("1", "ROOFING", Money::from_cents(100_000), Money::zero())],
//! );
//! let base = validate_input(&input).unwrap();
//! assert_eq!(base.lines, Money::from_cents(100_000));
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CategoryPre, Rate, ReconcileInput};

/// Result type for field validators.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest trade label accepted from an edit.
pub const MAX_CATEGORY_LABEL_LEN: usize = 100;

// =============================================================================
// Input Validator
// =============================================================================

/// Pre-scaling sums over every category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseTotals {
    /// Σ material_pre
    pub material: Money,
    /// Σ labor_pre
    pub labor: Money,
    /// material + labor
    pub lines: Money,
}

impl BaseTotals {
    /// Sums the categories. `None` when a sum does not fit in cents.
    pub fn from_categories(categories: &[CategoryPre]) -> Option<Self> {
        let material = Money::checked_sum(categories.iter().map(|c| c.material_pre))?;
        let labor = Money::checked_sum(categories.iter().map(|c| c.labor_pre))?;
        Some(BaseTotals {
            material,
            labor,
            lines: material.checked_add(labor)?,
        })
    }
}

/// Rejects inputs the engine cannot reconcile and returns the base sums.
///
/// Fails with [`CoreError::InvalidInput`] when `definitive_total <= 0` or
/// the pre-scaling lines sum to `<= 0`, and with [`CoreError::Overflow`]
/// when the sums do not fit in cents.
pub fn validate_input(input: &ReconcileInput) -> CoreResult<BaseTotals> {
    let base = BaseTotals::from_categories(&input.categories_pre)
        .ok_or(CoreError::Overflow { stage: "base totals" })?;

    if !input.definitive_total.is_positive() || !base.lines.is_positive() {
        return Err(CoreError::InvalidInput {
            definitive_total: input.definitive_total,
            base_lines: base.lines,
        });
    }

    Ok(base)
}

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a trade label.
///
/// ## Rules
/// - Must not be blank
/// - At most [`MAX_CATEGORY_LABEL_LEN`] characters
pub fn validate_category_label(label: &str) -> ValidationResult<()> {
    let label = label.trim();

    if label.is_empty() {
        return Err(ValidationError::Required {
            field: "category".to_string(),
        });
    }

    if label.chars().count() > MAX_CATEGORY_LABEL_LEN {
        return Err(ValidationError::TooLong {
            field: "category".to_string(),
            max: MAX_CATEGORY_LABEL_LEN,
        });
    }

    Ok(())
}

/// Validates a material or labor figure entered by hand. Zero is allowed.
pub fn validate_category_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a definitive total before a session is opened.
pub fn validate_definitive_total(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "definitiveTotal".to_string(),
        });
    }

    Ok(())
}

/// Validates an O&P or tax rate.
///
/// ## Rules
/// - At most 100%
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate > Rate::ONE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: Rate::zero().to_string(),
            max: Rate::ONE.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

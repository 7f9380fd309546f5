//! # Error Types
//!
//! Domain-specific error types for reconciler-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  reconciler-core errors (this file)                                    │
//! │  ├── CoreError        - InvalidInput and Overflow failures             │
//! │  └── ValidationError  - Field-level validation of edits and rates      │
//! │                                                                         │
//! │  reconciler-session errors (separate crate)                            │
//! │  └── SessionError     - Config, I/O, and wrapped CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError → caller             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine rejects unreconcilable totals with [`CoreError::InvalidInput`]
//! and amounts it cannot carry in cents with [`CoreError::Overflow`].
//! The residual shortfall left after correction is not an error.

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Reconciliation failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The budget cannot be reconciled.
    ///
    /// ## When This Occurs
    /// - `definitive_total <= 0`
    /// - Σ material_pre + Σ labor_pre `<= 0` (no categories, or all zero)
    ///
    /// Retrying with the same input fails the same way. Callers fall back to
    /// a degraded display instead of propagating a crash.
    #[error(
        "Invalid totals: definitive total ({definitive_total}) and pre-scale lines ({base_lines}) must be > 0"
    )]
    InvalidInput {
        definitive_total: Money,
        base_lines: Money,
    },

    /// An amount too large to carry in cents through scaling and tax.
    ///
    /// Only reachable with totals near `i64::MAX` cents. Not an
    /// [`CoreError::InvalidInput`]: the totals are positive, just unrepresentable.
    #[error("Arithmetic overflow while computing {stage}")]
    Overflow { stage: &'static str },

    /// A hand edit or configured rate was rejected before reaching the engine.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for the engine's InvalidInput failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CoreError::InvalidInput { .. })
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Rejections of edited rows, targets and rates.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Blank category label.
    #[error("{field} is required")]
    Required { field: String },

    /// Category label over [`crate::validation::MAX_CATEGORY_LABEL_LEN`].
    #[error("{field} is longer than {max} characters")]
    TooLong { field: String, max: usize },

    /// Rate outside `min..=max`.
    #[error("{field} must be within {min}..={max}")]
    OutOfRange { field: String, min: String, max: String },

    /// Definitive total of zero or less.
    #[error("{field} must be greater than zero")]
    MustBePositive { field: String },

    /// Negative material or labor figure.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A rate that is not a finite, non-negative fraction.
    #[error("{field} is not valid: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Result of an engine call.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

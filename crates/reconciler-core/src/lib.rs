//! # reconciler-core: Budget Reconciliation Engine
//!
//! Takes unscaled trade estimates (material and labor per category) and one
//! authoritative target total, and produces a scaled, tax-adjusted,
//! O&P-inclusive budget whose components sum to the target, to the cent.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Budget Reconciler Architecture                      │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  Extraction (external)                                          │   │
//! │  │  estimate PDF ──► categories split into material / labor        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ReconcileInput                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ reconciler-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ reconcile │  │ validation│  │   │
//! │  │   │ Category* │  │   Money   │  │  S, tax,  │  │  Invalid  │  │   │
//! │  │   │ Rate      │  │ apply_rate│  │  residual │  │  Input    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO STATE • PURE FUNCTIONS                            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ ReconcileResult                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  reconciler-session (editing session, config, CLI)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Categories, rates, engine input and result
//! - [`money`] - Integer-cent money type
//! - [`reconcile`] - The reconciliation pipeline
//! - [`validation`] - Input validator and field validators
//! - [`totals`] - Budget roll-up for display
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, input never mutated
//! 2. **Integer Money**: amounts are cents, rates are parts per million
//! 3. **Exact Ratios**: the scaling factor is never rounded before use
//! 4. **Explicit Errors**: `Result<ReconcileResult, CoreError>`, never a panic
//!
//! ## Example Usage
//!
//! ```rust
//! use reconciler_core::{reconcile_budget, CategoryPre, Money, Rate, ReconcileInput};
//!
//! let input = ReconcileInput::new(
//!     Money::from_cents(130_000),
//!     vec![CategoryPre::new("1", "ROOFING", Money::from_cents(100_000), Money::zero())],
//! )
//! .with_o_and_p(Rate::zero())
//! .with_tax_rate(Rate::zero());
//!
//! let result = reconcile_budget(&input).unwrap();
//! assert_eq!(result.scaling_factor, 1.3);
//! assert_eq!(result.grand_total, Money::from_cents(130_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod reconcile;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconcile::reconcile_budget;
pub use totals::BudgetTotals;
pub use types::*;

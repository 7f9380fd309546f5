//! # Budget Editing Session
//!
//! Holds one reconciled budget while a human edits it, and re-invokes the
//! engine after every edit.
//!
//! ## Thread Safety
//! [`SessionState`] wraps the session in `Arc<Mutex<T>>` so several callers
//! (UI commands, a CLI driver) can share it. Every write takes the lock
//! exclusively; reads release it as soon as the closure returns.
//!
//! ## Edit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Operations                                  │
//! │                                                                         │
//! │  Edit Action              Session Method            Engine Input        │
//! │  ───────────              ──────────────            ────────────        │
//! │                                                                         │
//! │  Load estimate ──────────► reconcile_initial() ───► raw categories      │
//! │                                                                         │
//! │  Blur a cell ────────────► update_categories() ──► rows per mode       │
//! │                                                                         │
//! │  Add row ────────────────► add_category() ───────► rows + zero row     │
//! │                                                                         │
//! │  Delete row ─────────────► remove_category() ────► rows - row          │
//! │                                                                         │
//! │  Change O&P ─────────────► update_o_and_p() ─────► rows per mode       │
//! │                                                                         │
//! │  Render ─────────────────► snapshot() ───────────► (read only)         │
//! │                                                                         │
//! │  InvalidInput on an edit  → degraded result, edited rows kept           │
//! │  InvalidInput on O&P      → previous result kept, error returned        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use reconciler_core::validation::{
    validate_category_amount, validate_category_label, validate_rate,
};
use reconciler_core::{
    reconcile_budget, BudgetTotals, CategoryPre, CategoryScaled, Money, Rate, ReconcileInput,
    ReconcileResult,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{BaselineMode, ReconcilerConfig};
use crate::error::{SessionError, SessionResult};

// =============================================================================
// Session
// =============================================================================

/// One budget under edit.
///
/// ## Invariants
/// - `definitive_total` never changes for the life of the session
/// - `result` is always the outcome of the last accepted edit (or the
///   degraded placeholder when that edit left nothing to scale)
/// - `baseline` holds the pre-scaling rows `result` was computed from
#[derive(Debug, Clone)]
pub struct BudgetSession {
    definitive_total: Money,
    o_and_p_rate: Rate,
    tax_rate: Rate,
    mode: BaselineMode,
    tolerance: Money,
    baseline: Vec<CategoryPre>,
    result: ReconcileResult,
    degraded: bool,
    revision: u64,
    reconciled_at: DateTime<Utc>,
}

impl BudgetSession {
    /// Reconciles freshly extracted categories and opens a session.
    ///
    /// Rates missing from `input` are taken from `config`. An input the
    /// engine rejects is returned as an error; there is nothing to fall
    /// back to yet.
    pub fn reconcile_initial(input: ReconcileInput, config: &ReconcilerConfig) -> SessionResult<Self> {
        let o_and_p_rate = input.o_and_p_percent.unwrap_or(config.rates.o_and_p_percent);
        let tax_rate = input.tax_rate.unwrap_or(config.rates.tax_rate);
        validate_rate("oAndPPercent", o_and_p_rate)?;
        validate_rate("taxRate", tax_rate)?;

        let input = ReconcileInput {
            o_and_p_percent: Some(o_and_p_rate),
            tax_rate: Some(tax_rate),
            ..input
        };
        let result = reconcile_budget(&input)?;

        let session = BudgetSession {
            definitive_total: input.definitive_total,
            o_and_p_rate,
            tax_rate,
            mode: config.session.baseline_mode,
            tolerance: config.tolerance(),
            baseline: input.categories_pre,
            result,
            degraded: false,
            revision: 0,
            reconciled_at: Utc::now(),
        };
        session.log_result();

        Ok(session)
    }

    /// Re-reconciles after the rows were edited, added or removed.
    ///
    /// ## Behavior
    /// - Blank labels and negative figures are rejected; the session is unchanged
    /// - When the engine reports `InvalidInput` (every row deleted or
    ///   zeroed), the degraded result is installed and the edited rows kept
    /// - Amounts too large to carry in cents are returned as an error; the
    ///   session is unchanged
    pub fn update_categories(&mut self, edited: Vec<CategoryScaled>) -> SessionResult<&ReconcileResult> {
        for row in &edited {
            validate_category_label(&row.category)?;
            validate_category_amount("materialScaled", row.material_scaled)?;
            validate_category_amount("laborScaled", row.labor_scaled)?;
        }

        let rows = self.pre_scaling_rows(&edited);
        let input = self.engine_input(rows.clone(), self.o_and_p_rate);

        match reconcile_budget(&input) {
            Ok(result) => self.accept(rows, result, false),
            Err(err) if err.is_invalid_input() => {
                warn!(error = %err, "Budget cannot be reconciled, showing degraded totals");
                let fallback =
                    ReconcileResult::degraded(self.definitive_total, self.o_and_p_rate, edited)?;
                self.accept(rows, fallback, true);
            }
            Err(err) => return Err(err.into()),
        }

        Ok(&self.result)
    }

    /// Changes the O&P percentage and re-reconciles the current rows.
    ///
    /// On failure the previous rate and result stay in place.
    pub fn update_o_and_p(&mut self, rate: Rate) -> SessionResult<&ReconcileResult> {
        validate_rate("oAndPPercent", rate)?;

        let rows = self.pre_scaling_rows(&self.result.categories);
        let input = self.engine_input(rows.clone(), rate);

        match reconcile_budget(&input) {
            Ok(result) => {
                self.o_and_p_rate = rate;
                self.accept(rows, result, false);
                Ok(&self.result)
            }
            Err(err) => {
                warn!(error = %err, %rate, "Reconciliation failed on O&P update");
                Err(err.into())
            }
        }
    }

    /// Appends an empty row and re-reconciles. Returns the new row's id.
    pub fn add_category(&mut self, label: &str) -> SessionResult<String> {
        validate_category_label(label)?;

        let id = Uuid::new_v4().to_string();
        let blank = CategoryPre::new(id.clone(), label.trim(), Money::zero(), Money::zero());

        let mut rows = self.result.categories.clone();
        rows.push(CategoryScaled::from_pre(&blank, Money::zero(), Money::zero()));
        self.update_categories(rows)?;

        Ok(id)
    }

    /// Deletes a row by id and re-reconciles.
    pub fn remove_category(&mut self, id: &str) -> SessionResult<()> {
        let mut rows = self.result.categories.clone();
        let initial_len = rows.len();
        rows.retain(|row| row.id != id);

        if rows.len() == initial_len {
            return Err(SessionError::CategoryNotFound(id.to_string()));
        }

        self.update_categories(rows)?;
        Ok(())
    }

    /// Read-only view for rendering and export.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            definitive_total: self.definitive_total,
            o_and_p_percent: self.o_and_p_rate,
            tax_rate: self.tax_rate,
            baseline_mode: self.mode,
            totals: BudgetTotals::from(&self.result),
            reconciled: self.is_reconciled(),
            degraded: self.degraded,
            revision: self.revision,
            reconciled_at: self.reconciled_at,
            result: self.result.clone(),
        }
    }

    /// True when the grand total is within the configured tolerance.
    pub fn is_reconciled(&self) -> bool {
        !self.degraded && self.result.is_reconciled(self.definitive_total, self.tolerance)
    }

    pub fn result(&self) -> &ReconcileResult {
        &self.result
    }

    pub fn definitive_total(&self) -> Money {
        self.definitive_total
    }

    pub fn o_and_p_rate(&self) -> Rate {
        self.o_and_p_rate
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Builds the engine's pre-scaling rows from the rows on screen.
    ///
    /// In compounding mode every row's scaled figures become its new
    /// pre-scaling figures. In original mode a row whose scaled figures are
    /// unchanged since the last result keeps its baseline figures, and only
    /// edited or new rows contribute their on-screen figures.
    fn pre_scaling_rows(&self, rows: &[CategoryScaled]) -> Vec<CategoryPre> {
        match self.mode {
            BaselineMode::Compounding => rows.iter().map(CategoryScaled::to_compounding_pre).collect(),
            BaselineMode::Original => rows
                .iter()
                .map(|row| {
                    let previous = self.result.categories.iter().find(|c| c.id == row.id);
                    let baseline = self.baseline.iter().find(|c| c.id == row.id);

                    match (previous, baseline) {
                        (Some(prev), Some(base))
                            if prev.material_scaled == row.material_scaled
                                && prev.labor_scaled == row.labor_scaled =>
                        {
                            CategoryPre {
                                material_pre: base.material_pre,
                                labor_pre: base.labor_pre,
                                ..row.to_compounding_pre()
                            }
                        }
                        _ => row.to_compounding_pre(),
                    }
                })
                .collect(),
        }
    }

    fn engine_input(&self, rows: Vec<CategoryPre>, o_and_p_rate: Rate) -> ReconcileInput {
        ReconcileInput::new(self.definitive_total, rows)
            .with_o_and_p(o_and_p_rate)
            .with_tax_rate(self.tax_rate)
    }

    fn accept(&mut self, rows: Vec<CategoryPre>, result: ReconcileResult, degraded: bool) {
        self.baseline = rows;
        self.result = result;
        self.degraded = degraded;
        self.revision += 1;
        self.reconciled_at = Utc::now();

        if !degraded {
            self.log_result();
        }
    }

    fn log_result(&self) {
        let result = &self.result;
        info!(
            revision = self.revision,
            mode = %self.mode,
            scaling_factor = result.scaling_factor,
            grand_total = %result.grand_total,
            categories = result.categories.len(),
            "Budget reconciled"
        );

        if let Some(adjustment) = &result.residual_adjustment {
            warn!(
                amount = %adjustment.amount,
                category = %adjustment.applied_to_category,
                "Residual rounding adjustment applied"
            );
        }

        let mismatch = result.mismatch(self.definitive_total);
        if !mismatch.is_zero() {
            warn!(
                %mismatch,
                target = %self.definitive_total,
                grand_total = %result.grand_total,
                "Grand total still misses the definitive total after correction"
            );
        }
    }
}

/// Everything a renderer needs, detached from the lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub definitive_total: Money,
    pub o_and_p_percent: Rate,
    pub tax_rate: Rate,
    pub baseline_mode: BaselineMode,
    pub totals: BudgetTotals,
    pub reconciled: bool,
    pub degraded: bool,
    pub revision: u64,
    pub reconciled_at: DateTime<Utc>,
    pub result: ReconcileResult,
}

// =============================================================================
// Shared State
// =============================================================================

/// Shared handle to a [`BudgetSession`].
///
/// ## Usage
/// ```rust,ignore
/// let snapshot = state.with_session(|session| session.snapshot());
/// state.with_session_mut(|session| session.update_o_and_p(rate))?;
/// ```
#[derive(Debug, Clone)]
pub struct SessionState {
    session: Arc<Mutex<BudgetSession>>,
}

impl SessionState {
    pub fn new(session: BudgetSession) -> Self {
        SessionState {
            session: Arc::new(Mutex::new(session)),
        }
    }

    /// Executes a function with read access to the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&BudgetSession) -> R,
    {
        let session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&session)
    }

    /// Executes a function with write access to the session.
    pub fn with_session_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut BudgetSession) -> R,
    {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut session)
    }
}

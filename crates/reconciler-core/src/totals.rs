//! # Budget Totals
//!
//! Roll-up of a reconciled budget for the totals panel and exports:
//! pre-scaling sums next to their scaled counterparts.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::ReconcileResult;

/// Budget-wide sums before and after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BudgetTotals {
    pub materials_pre: Money,
    pub labor_pre: Money,
    pub lines_pre: Money,
    pub materials_scaled: Money,
    pub labor_scaled: Money,
    pub subtotal_lines_scaled: Money,
    pub grand_total: Money,
}

impl From<&ReconcileResult> for BudgetTotals {
    fn from(result: &ReconcileResult) -> Self {
        let materials_pre: Money = result.categories.iter().map(|c| c.material_pre).sum();
        let labor_pre: Money = result.categories.iter().map(|c| c.labor_pre).sum();

        BudgetTotals {
            materials_pre,
            labor_pre,
            lines_pre: materials_pre + labor_pre,
            materials_scaled: result.materials_scaled(),
            labor_scaled: result.labor_scaled(),
            subtotal_lines_scaled: result.subtotal_lines_scaled,
            grand_total: result.grand_total,
        }
    }
}

//! # Definitive Total Resolution
//!
//! Picks the single authoritative grand total before the engine runs.
//!
//! ## Precedence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Dollar amount in the estimate filename   "Estimate-$123,456.78.pdf" │
//! │  2. RCV total printed in the document                                   │
//! │  3. Neither: None (the engine is not called, user input required)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! When both exist and differ, the filename wins.

use once_cell::sync::Lazy;
use reconciler_core::Money;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `$` followed by a grouped (`123,456`) or plain (`123456`) dollar figure
/// and an optional one or two digit cents part.
static FILENAME_AMOUNT: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"\$\s*([0-9]{1,3}(?:,[0-9]{3})+|[0-9]+)(?:\.([0-9]{1,2}))?").ok()
});

/// Where the definitive total came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitiveSource {
    #[serde(rename = "filename")]
    Filename,
    #[serde(rename = "RCV")]
    Rcv,
}

impl std::fmt::Display for DefinitiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitiveSource::Filename => write!(f, "filename"),
            DefinitiveSource::Rcv => write!(f, "RCV"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitiveTotal {
    pub amount: Money,
    pub source: DefinitiveSource,
}

/// Extracts the first positive dollar amount embedded in a filename.
///
/// ## Example
/// ```rust
/// use reconciler_core::Money;
/// use reconciler_session::definitive::amount_from_filename;
///
/// assert_eq!(
///     amount_from_filename("Estimate-$123,456.78.pdf"),
///     Some(Money::from_cents(12_345_678))
/// );
/// assert_eq!(amount_from_filename("Estimate.pdf"), None);
/// ```
pub fn amount_from_filename(filename: &str) -> Option<Money> {
    let captures = FILENAME_AMOUNT.as_ref()?.captures(filename)?;

    let major: i64 = captures.get(1)?.as_str().replace(',', "").parse().ok()?;
    let minor = match captures.get(2).map(|m| m.as_str()) {
        Some(digits) if digits.len() == 1 => digits.parse::<i64>().ok()? * 10,
        Some(digits) => digits.parse::<i64>().ok()?,
        None => 0,
    };

    let cents = major.checked_mul(100)?.checked_add(minor)?;
    let amount = Money::from_cents(cents);
    amount.is_positive().then_some(amount)
}

/// Applies the filename-over-RCV precedence.
///
/// Returns `None` when neither source yields a positive amount.
pub fn resolve(filename: Option<&str>, rcv_total: Option<Money>) -> Option<DefinitiveTotal> {
    let from_filename = filename.and_then(amount_from_filename);
    let rcv_total = rcv_total.filter(|amount| amount.is_positive());

    match (from_filename, rcv_total) {
        (Some(amount), rcv) => {
            if let Some(rcv) = rcv.filter(|rcv| *rcv != amount) {
                debug!(%amount, %rcv, "Filename total differs from RCV, using filename");
            }
            Some(DefinitiveTotal {
                amount,
                source: DefinitiveSource::Filename,
            })
        }
        (None, Some(amount)) => Some(DefinitiveTotal {
            amount,
            source: DefinitiveSource::Rcv,
        }),
        (None, None) => None,
    }
}

//! # Reconciler Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RECONCILER_O_AND_P=0.25                                            │
//! │     RECONCILER_TAX_RATE=0.0825                                         │
//! │     RECONCILER_BASELINE_MODE=original                                  │
//! │     RECONCILER_TOLERANCE_CENTS=1                                       │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/budget-reconciler/reconciler.toml (Linux)                │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     O&P 30%, tax 7%, compounding, 1 cent tolerance                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [rates]
//! o_and_p_percent = 0.30
//! tax_rate = 0.07
//!
//! [session]
//! baseline_mode = "compounding"  # compounding | original
//! reconciled_tolerance_cents = 1
//!
//! [display]
//! currency_symbol = "$"
//! ```

use reconciler_core::validation::validate_rate;
use reconciler_core::{Money, Rate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};

/// File name looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "reconciler.toml";

// =============================================================================
// Baseline Mode
// =============================================================================

/// What an edit re-reconciles from.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  COMPOUNDING (Default)                                                  │
/// │  ─────────────────────                                                  │
/// │  • The previous result's scaled figures become the new pre-scaling     │
/// │    input. Each pass treats the last result as ground truth, so the     │
/// │    new factor multiplies on top of the old one.                        │
/// │                                                                         │
/// │  ORIGINAL                                                               │
/// │  ────────                                                               │
/// │  • Unedited rows keep their raw extracted figures and are rescaled     │
/// │    from scratch. Edited and added rows replace their baseline rows.    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineMode {
    #[default]
    Compounding,
    Original,
}

impl std::fmt::Display for BaselineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaselineMode::Compounding => write!(f, "compounding"),
            BaselineMode::Original => write!(f, "original"),
        }
    }
}

impl std::str::FromStr for BaselineMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compounding" | "compound" => Ok(BaselineMode::Compounding),
            "original" | "raw" | "baseline" => Ok(BaselineMode::Original),
            other => Err(SessionError::InvalidConfig(format!(
                "Unknown baseline mode: '{}'. Valid options: compounding, original",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Default rates applied when an input leaves them unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSettings {
    #[serde(default = "default_o_and_p")]
    pub o_and_p_percent: Rate,

    #[serde(default = "default_tax_rate")]
    pub tax_rate: Rate,
}

fn default_o_and_p() -> Rate {
    Rate::DEFAULT_O_AND_P
}

fn default_tax_rate() -> Rate {
    Rate::DEFAULT_TAX
}

impl Default for RateSettings {
    fn default() -> Self {
        RateSettings {
            o_and_p_percent: default_o_and_p(),
            tax_rate: default_tax_rate(),
        }
    }
}

/// Editing session behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub baseline_mode: BaselineMode,

    /// Largest grand-total gap still shown as "reconciled".
    #[serde(default = "default_tolerance_cents")]
    pub reconciled_tolerance_cents: i64,
}

fn default_tolerance_cents() -> i64 {
    1
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            baseline_mode: BaselineMode::default(),
            reconciled_tolerance_cents: default_tolerance_cents(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            currency_symbol: default_currency_symbol(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete reconciler configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default)]
    pub rates: RateSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub display: DisplaySettings,
}

impl ReconcilerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (reconciler.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading reconciler config from file");
                let contents = std::fs::read_to_string(&path).map_err(|e| {
                    SessionError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
                })?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load reconciler config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Reconciler config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        validate_rate("o_and_p_percent", self.rates.o_and_p_percent)
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;
        validate_rate("tax_rate", self.rates.tax_rate)
            .map_err(|e| SessionError::InvalidConfig(e.to_string()))?;

        if self.session.reconciled_tolerance_cents < 0 {
            return Err(SessionError::InvalidConfig(
                "reconciled_tolerance_cents must not be negative".into(),
            ));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `RECONCILER_*` overrides from `lookup`. Unparseable values are
    /// logged and ignored.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("RECONCILER_O_AND_P") {
            match value.trim().parse::<f64>().ok().and_then(|f| Rate::from_fraction(f).ok()) {
                Some(rate) => {
                    debug!(%rate, "Overriding O&P rate from environment");
                    self.rates.o_and_p_percent = rate;
                }
                None => warn!(value = %value, "Ignoring unparseable RECONCILER_O_AND_P"),
            }
        }

        if let Some(value) = lookup("RECONCILER_TAX_RATE") {
            match value.trim().parse::<f64>().ok().and_then(|f| Rate::from_fraction(f).ok()) {
                Some(rate) => {
                    debug!(%rate, "Overriding tax rate from environment");
                    self.rates.tax_rate = rate;
                }
                None => warn!(value = %value, "Ignoring unparseable RECONCILER_TAX_RATE"),
            }
        }

        if let Some(value) = lookup("RECONCILER_BASELINE_MODE") {
            match value.parse::<BaselineMode>() {
                Ok(mode) => {
                    debug!(%mode, "Overriding baseline mode from environment");
                    self.session.baseline_mode = mode;
                }
                Err(e) => warn!(error = %e, "Ignoring RECONCILER_BASELINE_MODE"),
            }
        }

        if let Some(value) = lookup("RECONCILER_TOLERANCE_CENTS") {
            if let Ok(cents) = value.trim().parse::<i64>() {
                self.session.reconciled_tolerance_cents = cents;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "budget", "reconciler")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tolerance(&self) -> Money {
        Money::from_cents(self.session.reconciled_tolerance_cents)
    }

    /// Formats an amount with the configured symbol and thousands separators.
    ///
    /// ## Example
    /// ```rust
    /// use reconciler_core::Money;
    /// use reconciler_session::ReconcilerConfig;
    ///
    /// let config = ReconcilerConfig::default();
    /// assert_eq!(config.format_currency(Money::from_cents(12_345_678)), "$123,456.78");
    /// ```
    pub fn format_currency(&self, amount: Money) -> String {
        let digits = amount.dollars().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        format!(
            "{}{}{}.{:02}",
            if amount.is_negative() { "-" } else { "" },
            self.display.currency_symbol,
            grouped,
            amount.cents_part()
        )
    }
}

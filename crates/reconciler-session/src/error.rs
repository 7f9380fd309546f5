//! # Session Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Engine      │  │     Editing             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Core           │  │  CategoryNotFound       │ │
//! │  │  ConfigLoad/Save│  │  (InvalidInput, │  │  Validation             │ │
//! │  │  Toml*          │  │   Validation)   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                   │
//! │  │  I/O            │   Io, Json                                        │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use reconciler_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid reconciler configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    /// The engine rejected the budget (wraps CoreError).
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Editing Errors
    // =========================================================================
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("No definitive total could be resolved for {0}")]
    MissingDefinitiveTotal(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        SessionError::Core(CoreError::Validation(err))
    }
}

impl SessionError {
    /// True when the engine rejected the budget as unreconcilable.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, SessionError::Core(err) if err.is_invalid_input())
    }
}

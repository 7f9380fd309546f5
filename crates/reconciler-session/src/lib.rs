//! # reconciler-session: Editing Session & CLI
//!
//! Everything around the pure engine that touches the outside world:
//! configuration files, environment variables, logging, the editing session
//! that re-invokes the engine after every edit, and definitive total
//! resolution.
//!
//! ## Modules
//!
//! - [`config`] - `reconciler.toml` + `RECONCILER_*` overrides
//! - [`definitive`] - Filename-over-RCV definitive total precedence
//! - [`session`] - Editing session with degraded fallback
//! - [`error`] - Session error types

use tracing_subscriber::EnvFilter;

pub mod config;
pub mod definitive;
pub mod error;
pub mod session;

pub use config::{BaselineMode, ReconcilerConfig};
pub use definitive::{DefinitiveSource, DefinitiveTotal};
pub use error::{SessionError, SessionResult};
pub use session::{BudgetSession, SessionSnapshot, SessionState};

/// Initializes the tracing subscriber on stderr.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=reconciler=trace` - Show trace for reconciler crates only
/// - Default: INFO, DEBUG for reconciler crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,reconciler=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

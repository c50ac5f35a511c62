//! Shared types and utilities for the formula generator components.
//!
//! The validator and the static pattern matcher live here so both the daemon
//! and the CLI can run them without a network round-trip.

pub mod error;
pub mod patterns;
pub mod types;
pub mod validator;

pub use error::{PatternError, ValidationError};
pub use patterns::{default_formula, PatternDecl, PatternTable, Template};
pub use types::{
    cache_key, ErrorBody, FormulaRequest, FormulaResponse, FormulaResult, FormulaSource,
    GenerateFormulaBody, HealthResponse, MAX_SAMPLE_VALUES,
};
pub use validator::{check, validate};

/// Version shared by the daemon and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default daemon port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default daemon URL used by the CLI.
pub const DEFAULT_DAEMON_URL: &str = "http://127.0.0.1:3000";

//! Error types shared by the validator and the pattern table.

use thiserror::Error;

/// Reason a formula was rejected by the validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("formula must start with '='")]
    MissingEquals,

    #[error("formula length {0} is outside 2..=500 characters")]
    Length(usize),

    #[error("formula uses blocked function {0}")]
    BlockedFunction(&'static str),

    #[error("formula has unbalanced parentheses")]
    UnbalancedParentheses,

    #[error("formula has an odd number of double quotes")]
    UnbalancedQuotes,
}

/// Pattern table construction failure. Raised at startup, never per request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("pattern phrase is empty")]
    EmptyPhrase,

    #[error("pattern phrase '{0}' is declared twice")]
    DuplicatePhrase(String),

    #[error("alias '{phrase}' points at unknown phrase '{target}'")]
    UnknownAlias { phrase: String, target: String },

    #[error("alias cycle: {}", .0.join(" -> "))]
    AliasCycle(Vec<String>),
}

//! Surface-level safety checks for formula text.
//!
//! Formulas are never parsed or evaluated. A formula passes only if every rule
//! holds: leading `=`, length within bounds, no blocked function name anywhere
//! (case-insensitive), balanced parentheses, and an even number of double quotes.

use crate::error::ValidationError;

/// Minimum accepted length in characters, `=` included.
pub const MIN_FORMULA_LEN: usize = 2;

/// Maximum accepted length in characters.
pub const MAX_FORMULA_LEN: usize = 500;

/// Functions that import external data, destroy data, execute code, or
/// inject links and embeds. Matched as substrings of the upper-cased formula.
pub const BLOCKED_FUNCTIONS: &[&str] = &[
    "IMPORTRANGE",
    "IMPORTDATA",
    "IMPORTXML",
    "IMPORTHTML",
    "IMPORTFEED",
    "DELETE",
    "REMOVE",
    "DROP",
    "EXECUTE",
    "SCRIPT",
    "EVAL",
    "IMAGE",
    "URL",
    "HYPERLINK",
];

/// Returns true when the formula passes every rule.
pub fn validate(formula: &str) -> bool {
    check(formula).is_ok()
}

/// Runs the rules in order and reports the first one that fails.
pub fn check(formula: &str) -> Result<(), ValidationError> {
    if !formula.starts_with('=') {
        return Err(ValidationError::MissingEquals);
    }

    let len = formula.chars().count();
    if !(MIN_FORMULA_LEN..=MAX_FORMULA_LEN).contains(&len) {
        return Err(ValidationError::Length(len));
    }

    let upper = formula.to_uppercase();
    if let Some(blocked) = BLOCKED_FUNCTIONS.iter().find(|f| upper.contains(*f)) {
        return Err(ValidationError::BlockedFunction(*blocked));
    }

    let mut depth: i64 = 0;
    for c in formula.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ValidationError::UnbalancedParentheses);
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ValidationError::UnbalancedParentheses);
    }

    // Escaped quotes are not understood; an even count is all we ask for.
    if formula.chars().filter(|c| *c == '"').count() % 2 != 0 {
        return Err(ValidationError::UnbalancedQuotes);
    }

    Ok(())
}

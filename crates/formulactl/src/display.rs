//! Display helpers for formulactl output.

use formula_shared::{FormulaSource, HealthResponse, ValidationError};
use owo_colors::OwoColorize;

/// Bracketed source tag, colored by tier.
pub fn source_tag(source: FormulaSource) -> String {
    let tag = format!("[{}]", source);
    match source {
        FormulaSource::Generated => tag.green().to_string(),
        FormulaSource::Cache => tag.cyan().to_string(),
        FormulaSource::Fallback => tag.yellow().to_string(),
    }
}

/// Print a resolved formula with its provenance.
pub fn print_formula(formula: &str, source: FormulaSource, error_message: Option<&str>) {
    println!("{} {}", formula.bold(), source_tag(source));
    if let Some(reason) = error_message {
        println!("  {} {}", "reason:".dimmed(), reason);
    }
}

pub fn print_health(health: &HealthResponse) {
    let kw = 10;
    print_kv("status", &health.status.green().to_string(), kw);
    print_kv("version", &health.version, kw);
    print_kv("uptime", &format_uptime(health.uptime_seconds), kw);
    print_kv("cache", &format!("{} entries", health.cache_size), kw);
    print_kv("checked", &health.timestamp.to_rfc3339(), kw);
}

pub fn print_validation(formula: &str, result: &Result<(), ValidationError>) {
    match result {
        Ok(()) => println!("{} {}", "[OK]".green(), formula),
        Err(e) => println!("{} {}: {}", "[REJECTED]".bright_red().bold(), formula, e),
    }
}

fn print_kv(key: &str, value: &str, width: usize) {
    println!("{:width$} {}", key.dimmed(), value, width = width);
}

/// `3725` -> `1h 2m 5s`
pub fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {}m {}s", h, m, s)
    } else if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}

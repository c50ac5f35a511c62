//! Prompt building for formula generation.

use formula_shared::MAX_SAMPLE_VALUES;
use serde_json::Value;

/// Worked examples appended to every prompt
const WORKED_EXAMPLES: &str = r#"Examples:
CAGR: =POWER(INDEX(A2:A10,ROWS(A2:A10))/INDEX(A2:A10,1),1/(ROWS(A2:A10)-1))-1
Sum: =SUM(A2:A10)
Average without zeros: =AVERAGEIF(A2:A10,"<>0")"#;

/// Build the model prompt for a description and target range.
///
/// At most [`MAX_SAMPLE_VALUES`] sample values are embedded.
pub fn build_formula_prompt(description: &str, range: &str, sample: &[f64]) -> String {
    let sample = &sample[..sample.len().min(MAX_SAMPLE_VALUES)];
    let sample_line = if sample.is_empty() {
        String::new()
    } else {
        let values: Vec<Value> = sample.iter().copied().map(sample_value).collect();
        let encoded = serde_json::to_string(&values).unwrap_or_else(|_| format!("{:?}", sample));
        format!("Sample data: {}", encoded)
    };

    format!(
        "You are a Google Sheets expert. Create a formula for this task.\n\
         \n\
         Task: {description}\n\
         Range: {range}\n\
         {sample_line}\n\
         \n\
         Rules:\n\
         1. Return ONLY the formula starting with =\n\
         2. Use standard Google Sheets functions (SUM, AVERAGE, INDEX, etc.)\n\
         3. Reference the range: {range}\n\
         4. No explanations, just the formula\n\
         \n\
         {WORKED_EXAMPLES}\n\
         \n\
         Formula:"
    )
}

/// Largest magnitude at which every whole f64 is an exact integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Whole numbers are written without a fractional part (`3`, not `3.0`).
/// Non-finite values become `null`.
fn sample_value(v: f64) -> Value {
    if v.is_finite() && v.fract() == 0.0 && v.abs() <= MAX_EXACT_INTEGER {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

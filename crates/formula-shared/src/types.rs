//! Request, result and wire types for formula generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of sample values forwarded to the model prompt.
pub const MAX_SAMPLE_VALUES: usize = 5;

/// Which pipeline tier produced a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormulaSource {
    Cache,
    Generated,
    Fallback,
}

impl FormulaSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaSource::Cache => "cache",
            FormulaSource::Generated => "generated",
            FormulaSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for FormulaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to turn a description into a formula over a range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormulaRequest {
    pub range: String,
    pub description: String,
    pub sample_data: Option<Vec<f64>>,
}

impl FormulaRequest {
    pub fn new(range: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            range: range.into(),
            description: description.into(),
            sample_data: None,
        }
    }

    pub fn with_sample_data(mut self, sample: Vec<f64>) -> Self {
        self.sample_data = Some(sample);
        self
    }

    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.range.trim().is_empty() {
            missing.push("range");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        missing
    }

    /// Sample values as forwarded to the model, capped at [`MAX_SAMPLE_VALUES`].
    pub fn sample_preview(&self) -> &[f64] {
        match &self.sample_data {
            Some(values) => &values[..values.len().min(MAX_SAMPLE_VALUES)],
            None => &[],
        }
    }

    pub fn cache_key(&self) -> String {
        cache_key(&self.range, &self.description)
    }
}

/// Cache identity of a request: the range plus the lower-cased description.
pub fn cache_key(range: &str, description: &str) -> String {
    format!("{}|{}", range, description.to_lowercase())
}

/// Outcome of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaResult {
    pub formula: String,
    pub source: FormulaSource,
    pub error_message: Option<String>,
}

impl FormulaResult {
    pub fn generated(formula: String) -> Self {
        Self {
            formula,
            source: FormulaSource::Generated,
            error_message: None,
        }
    }

    pub fn fallback(formula: String, reason: String) -> Self {
        Self {
            formula,
            source: FormulaSource::Fallback,
            error_message: Some(reason),
        }
    }

    /// Same result, re-tagged as served from the cache.
    pub fn from_cache(mut self) -> Self {
        self.source = FormulaSource::Cache;
        self
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Body of `POST /generate-formula`. Fields are optional on the wire so a
/// missing field is reported as an input error instead of a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFormulaBody {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<Vec<f64>>,
}

impl From<GenerateFormulaBody> for FormulaRequest {
    fn from(body: GenerateFormulaBody) -> Self {
        Self {
            range: body.range.unwrap_or_default(),
            description: body.description.unwrap_or_default(),
            sample_data: body.sample_data,
        }
    }
}

/// Successful response of `POST /generate-formula`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaResponse {
    pub success: bool,
    pub formula: String,
    pub range: String,
    pub description: String,
    pub source: FormulaSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl FormulaResponse {
    pub fn new(request: &FormulaRequest, result: FormulaResult) -> Self {
        Self {
            success: true,
            formula: result.formula,
            range: request.range.clone(),
            description: request.description.clone(),
            source: result.source,
            error_message: result.error_message,
        }
    }
}

/// Failure body for rejected or failed requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub cache_size: usize,
}

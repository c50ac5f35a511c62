//! Model invocation: prompt in, candidate formula out.
//!
//! `ModelBackend` is the seam to the external generation process. Production
//! code uses [`OllamaBackend`], tests use [`FakeBackend`]. [`ModelInvoker`]
//! adds the enable switch, the deadline, prompt building and formula
//! extraction on top of a backend.
//!
//! One attempt per call. No retries.

pub mod fake;
pub mod ollama;

pub use fake::{FakeBackend, FakeBehavior};
pub use ollama::OllamaBackend;

use crate::config::ModelConfig;
use crate::prompts::build_formula_prompt;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a model invocation produced no candidate formula.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("model is disabled")]
    Disabled,

    #[error("model timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("failed to start model process: {0}")]
    Spawn(String),

    #[error("model process failed: {0}")]
    ProcessFailed(String),

    #[error("no formula extracted from model response")]
    NoFormula,

    #[error("model process I/O error: {0}")]
    Io(String),
}

// ============================================================================
// Backend trait
// ============================================================================

/// An external, independently versioned generation process.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run the model on a prompt and return its raw standard output. The
    /// process is terminated if it is still running when `deadline` elapses.
    async fn invoke(&self, prompt: &str, deadline: Duration) -> Result<String, ModelError>;

    /// Whether the process can be started at all. Never fails.
    async fn check_availability(&self) -> bool;
}

// ============================================================================
// Invoker
// ============================================================================

/// Wraps a backend with the enable switch, deadline and output extraction.
#[derive(Clone)]
pub struct ModelInvoker {
    backend: Arc<dyn ModelBackend>,
    enabled: bool,
    deadline: Duration,
}

impl ModelInvoker {
    pub fn new(backend: Arc<dyn ModelBackend>, enabled: bool, deadline: Duration) -> Self {
        Self {
            backend,
            enabled,
            deadline,
        }
    }

    /// Invoker backed by the configured model runner.
    pub fn from_config(config: &ModelConfig) -> Self {
        let backend = OllamaBackend::new(&config.command, &config.model);
        Self::new(Arc::new(backend), config.enabled, config.deadline())
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Ask the model for a formula. Fails immediately when disabled.
    pub async fn invoke(
        &self,
        description: &str,
        range: &str,
        sample: &[f64],
    ) -> Result<String, ModelError> {
        self.invoke_with_deadline(description, range, sample, self.deadline)
            .await
    }

    pub async fn invoke_with_deadline(
        &self,
        description: &str,
        range: &str,
        sample: &[f64],
        deadline: Duration,
    ) -> Result<String, ModelError> {
        if !self.enabled {
            return Err(ModelError::Disabled);
        }

        let prompt = build_formula_prompt(description, range, sample);
        let output = self.backend.invoke(&prompt, deadline).await?;
        debug!("Model returned {} bytes", output.len());

        extract_formula(&output).ok_or(ModelError::NoFormula)
    }

    /// Ask the backend whether it can run; reports false when disabled.
    pub async fn check_availability(&self) -> bool {
        self.enabled && self.backend.check_availability().await
    }
}

// ============================================================================
// Output extraction
// ============================================================================

/// Aggregate names that mark a line as formula-like in the secondary pass.
/// Matched anywhere in the line, so `MYSUM` and `SUMIF` count too.
static AGGREGATE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"SUM|AVERAGE|INDEX").expect("aggregate pattern is a valid regex")
});

/// Pull a candidate formula out of raw model output.
///
/// 1. First trimmed line starting with `=` and longer than 3 characters, verbatim.
/// 2. Else first line containing `=` and an aggregate name: text from the
///    first `=` up to the next whitespace.
pub fn extract_formula(output: &str) -> Option<String> {
    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('=') && trimmed.chars().count() > 3 {
            return Some(trimmed.to_string());
        }
    }

    for line in output.lines() {
        if let Some(start) = line.find('=') {
            if AGGREGATE_NAME.is_match(line) {
                let candidate = line[start..]
                    .split_whitespace()
                    .next()
                    .unwrap_or("=");
                return Some(candidate.to_string());
            }
        }
    }

    None
}

//! Formula resolution pipeline.
//!
//! Flow, first success wins:
//! 1. Cache hit (unexpired) -> `source = cache`
//! 2. Model invocation under the configured deadline
//! 3. Validator gate -> `source = generated`
//! 4. Any failure in 2-3 -> static pattern table -> `source = fallback`,
//!    with the failure reason in `error_message`
//!
//! Results from 3 and 4 are cached before returning. Exactly one model
//! attempt is made per uncached request. Concurrent misses on the same key
//! are not coalesced; each runs its own attempt and the last write wins.

use crate::cache::{CacheError, ResultCache};
use crate::invoker::{ModelError, ModelInvoker};
use formula_shared::{validator, FormulaRequest, FormulaResult, PatternTable, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures the pipeline cannot absorb.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CacheError> for ResolveError {
    fn from(e: CacheError) -> Self {
        ResolveError::Internal(e.to_string())
    }
}

/// Why the generated tier was skipped. Becomes the fallback's error message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationFailure {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("generated formula failed validation: {0}")]
    Rejected(#[from] ValidationError),
}

/// Three-tier resolver shared by all requests.
#[derive(Clone)]
pub struct FormulaResolver {
    cache: ResultCache,
    invoker: ModelInvoker,
    patterns: Arc<PatternTable>,
}

impl FormulaResolver {
    pub fn new(cache: ResultCache, invoker: ModelInvoker, patterns: Arc<PatternTable>) -> Self {
        Self {
            cache,
            invoker,
            patterns,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn invoker(&self) -> &ModelInvoker {
        &self.invoker
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    /// Resolve a request. Only malformed input and internal faults are errors.
    pub async fn resolve_formula(
        &self,
        request: &FormulaRequest,
    ) -> Result<FormulaResult, ResolveError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(ResolveError::InvalidInput(format!(
                "Missing required parameters: {}",
                missing.join(" and ")
            )));
        }

        let key = request.cache_key();
        if let Some(cached) = self.cache.get(&key)? {
            debug!("Cache hit for {}", key);
            return Ok(cached.from_cache());
        }

        let result = match self.generate(request).await {
            Ok(formula) => {
                info!("Generated formula for {:?}", request.description);
                FormulaResult::generated(formula)
            }
            Err(failure) => {
                warn!("Falling back to static pattern: {}", failure);
                let formula = self.patterns.resolve(&request.description, &request.range);
                FormulaResult::fallback(formula, failure.to_string())
            }
        };

        self.cache.put(&key, result.clone())?;
        Ok(result)
    }

    /// Tiers 2 and 3: one model attempt, then the validator gate.
    async fn generate(&self, request: &FormulaRequest) -> Result<String, GenerationFailure> {
        let candidate = self
            .invoker
            .invoke(&request.description, &request.range, request.sample_preview())
            .await?;
        validator::check(&candidate)?;
        Ok(candidate)
    }
}

//! Resolution pipeline tests.
//!
//! All model calls go through FakeBackend; no process is started.

use formula_shared::{FormulaRequest, FormulaResult, FormulaSource, PatternTable};
use formulad::cache::ResultCache;
use formulad::invoker::{FakeBackend, ModelError, ModelInvoker};
use formulad::orchestrator::{FormulaResolver, ResolveError};
use std::sync::Arc;
use std::time::Duration;

fn resolver_with(backend: FakeBackend, enabled: bool, deadline: Duration) -> FormulaResolver {
    FormulaResolver::new(
        ResultCache::new(Duration::from_secs(300)),
        ModelInvoker::new(Arc::new(backend), enabled, deadline),
        Arc::new(PatternTable::builtin().unwrap()),
    )
}

fn disabled_resolver() -> (FormulaResolver, FakeBackend) {
    let backend = FakeBackend::output("=MAX(A1:A2)");
    let resolver = resolver_with(backend.clone(), false, Duration::from_secs(1));
    (resolver, backend)
}

// ============================================================================
// Fallback Tier
// ============================================================================

#[tokio::test]
async fn test_disabled_model_falls_back_to_sum() {
    let (resolver, backend) = disabled_resolver();

    let result = resolver
        .resolve_formula(&FormulaRequest::new("B1:B5", "sum"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=SUM(B1:B5)");
    assert_eq!(result.source, FormulaSource::Fallback);
    assert_eq!(result.error_message.as_deref(), Some("model is disabled"));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_average_excluding_zeros_falls_back_to_averageif() {
    let (resolver, _) = disabled_resolver();

    let result = resolver
        .resolve_formula(&FormulaRequest::new("C2:C20", "average excluding zeros"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=AVERAGEIF(C2:C20,\"<>0\")");
    assert_eq!(result.source, FormulaSource::Fallback);
}

#[tokio::test]
async fn test_unknown_description_falls_back_to_average() {
    let (resolver, _) = disabled_resolver();

    let result = resolver
        .resolve_formula(&FormulaRequest::new("D1:D9", "do something clever"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=AVERAGE(D1:D9)");
    assert_eq!(result.source, FormulaSource::Fallback);
}

#[tokio::test]
async fn test_timeout_falls_back_with_reason() {
    let backend = FakeBackend::output("=SUM(A1:A5)").with_delay(Duration::from_millis(500));
    let resolver = resolver_with(backend.clone(), true, Duration::from_millis(50));

    let result = resolver
        .resolve_formula(&FormulaRequest::new("A1:A5", "total"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=SUM(A1:A5)");
    assert_eq!(result.source, FormulaSource::Fallback);
    assert_eq!(
        result.error_message.as_deref(),
        Some("model timed out after 50ms")
    );
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_process_failure_falls_back() {
    let backend = FakeBackend::failing(ModelError::ProcessFailed("model not found".into()));
    let resolver = resolver_with(backend, true, Duration::from_secs(1));

    let result = resolver
        .resolve_formula(&FormulaRequest::new("A1:A5", "median"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=MEDIAN(A1:A5)");
    assert_eq!(result.source, FormulaSource::Fallback);
    assert_eq!(
        result.error_message.as_deref(),
        Some("model process failed: model not found")
    );
}

#[tokio::test]
async fn test_unparseable_output_falls_back() {
    let backend = FakeBackend::output("I'm not sure what you mean.");
    let resolver = resolver_with(backend, true, Duration::from_secs(1));

    let result = resolver
        .resolve_formula(&FormulaRequest::new("A1:A5", "maximum"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=MAX(A1:A5)");
    assert_eq!(
        result.error_message.as_deref(),
        Some("no formula extracted from model response")
    );
}

#[tokio::test]
async fn test_unbalanced_output_is_rejected() {
    let backend = FakeBackend::output("=SUM((A1:A5)");
    let resolver = resolver_with(backend, true, Duration::from_secs(1));

    let result = resolver
        .resolve_formula(&FormulaRequest::new("A1:A5", "sum"))
        .await
        .unwrap();

    assert_eq!(result.formula, "=SUM(A1:A5)");
    assert_eq!(result.source, FormulaSource::Fallback);
    assert!(result
        .error_message
        .unwrap()
        .starts_with("generated formula failed validation"));
}

// ============================================================================
// Generated Tier
// ============================================================================

#[tokio::test]
async fn test_valid_output_is_generated() {
    let backend = FakeBackend::output("Formula:\n=AVERAGEIF(A2:A10,\">100\")\n");
    let resolver = resolver_with(backend, true, Duration::from_secs(1));

    let result = resolver
        .resolve_formula(&FormulaRequest::new("A2:A10", "average of values over 100"))
        .await
        .unwrap();

    assert_eq!(
        result,
        FormulaResult::generated("=AVERAGEIF(A2:A10,\">100\")".to_string())
    );
}

#[tokio::test]
async fn test_prompt_carries_request() {
    let backend = FakeBackend::output("=SUM(E1:E4)");
    let resolver = resolver_with(backend.clone(), true, Duration::from_secs(1));

    resolver
        .resolve_formula(&FormulaRequest::new("E1:E4", "add the numbers").with_sample_data(vec![1.5, 2.0]))
        .await
        .unwrap();

    let prompts = backend.prompts();
    assert!(prompts[0].contains("E1:E4"));
    assert!(prompts[0].contains("add the numbers"));
    assert!(prompts[0].contains("Sample data: [1.5,2]"));
}

// ============================================================================
// Cache Tier
// ============================================================================

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let backend = FakeBackend::output("=SUM(A1:A3)");
    let resolver = resolver_with(backend.clone(), true, Duration::from_secs(1));
    let request = FormulaRequest::new("A1:A3", "add up");

    let first = resolver.resolve_formula(&request).await.unwrap();
    let second = resolver.resolve_formula(&request).await.unwrap();

    assert_eq!(first.source, FormulaSource::Generated);
    assert_eq!(second.source, FormulaSource::Cache);
    assert_eq!(first.formula, second.formula);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_cache_key_ignores_description_case() {
    let (resolver, _) = disabled_resolver();

    let first = resolver
        .resolve_formula(&FormulaRequest::new("A2:A10", "cagr"))
        .await
        .unwrap();
    assert!(resolver.cache().get("A2:A10|cagr").unwrap().is_some());

    let second = resolver
        .resolve_formula(&FormulaRequest::new("A2:A10", "CAGR"))
        .await
        .unwrap();

    assert_eq!(second.source, FormulaSource::Cache);
    assert_eq!(second.formula, first.formula);
}

#[tokio::test]
async fn test_cache_hit_keeps_fallback_reason() {
    let (resolver, _) = disabled_resolver();
    let request = FormulaRequest::new("B1:B5", "sum");

    resolver.resolve_formula(&request).await.unwrap();
    let cached = resolver.resolve_formula(&request).await.unwrap();

    assert_eq!(cached.source, FormulaSource::Cache);
    assert_eq!(cached.error_message.as_deref(), Some("model is disabled"));
}

#[tokio::test]
async fn test_range_is_part_of_cache_key() {
    let (resolver, _) = disabled_resolver();

    resolver
        .resolve_formula(&FormulaRequest::new("B1:B5", "sum"))
        .await
        .unwrap();
    let other = resolver
        .resolve_formula(&FormulaRequest::new("C1:C5", "sum"))
        .await
        .unwrap();

    assert_eq!(other.source, FormulaSource::Fallback);
    assert_eq!(other.formula, "=SUM(C1:C5)");
}

#[tokio::test]
async fn test_expired_entry_is_regenerated() {
    let backend = FakeBackend::output("=SUM(A1:A3)");
    let resolver = FormulaResolver::new(
        ResultCache::new(Duration::from_millis(50)),
        ModelInvoker::new(Arc::new(backend.clone()), true, Duration::from_secs(1)),
        Arc::new(PatternTable::builtin().unwrap()),
    );
    let request = FormulaRequest::new("A1:A3", "add up");

    resolver.resolve_formula(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let again = resolver.resolve_formula(&request).await.unwrap();

    assert_eq!(again.source, FormulaSource::Generated);
    assert_eq!(backend.calls(), 2);
}

// ============================================================================
// Input Validation
// ============================================================================

#[tokio::test]
async fn test_missing_fields_rejected_before_any_tier() {
    let backend = FakeBackend::output("=SUM(A1)");
    let resolver = resolver_with(backend.clone(), true, Duration::from_secs(1));

    let err = resolver
        .resolve_formula(&FormulaRequest::new("A1:A5", "  "))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::InvalidInput("Missing required parameters: description".to_string())
    );

    let err = resolver
        .resolve_formula(&FormulaRequest::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ResolveError::InvalidInput("Missing required parameters: range and description".to_string())
    );

    assert_eq!(backend.calls(), 0);
    assert!(resolver.cache().is_empty().unwrap());
}

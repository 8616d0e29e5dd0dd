//! Integration tests for the analysis pipeline.
//!
//! These tests verify the end-to-end flow:
//! 1. Built-in modules are registered into an injected registry
//! 2. The runner resolves a stored run into a dataset and context
//! 3. The execution service validates and dispatches to the handler
//! 4. Results serialize into the transport report
//!
//! Uses in-memory implementations to test the pipeline without external
//! dependencies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use promptlab::adapters::ai::MockModelClient;
use promptlab::adapters::memory::InMemoryRunStore;
use promptlab::application::{
    serialize_result, AnalysisRunner, ExecutionService, RunAnalysisError,
};
use promptlab::domain::analysis::{
    register_builtin_modules, AnalysisContext, AnalysisError, AnalysisHandler, AnalysisResult,
    DataTable, ExecutionRequest, JsonMap, ModuleDefinition, ModuleRegistry, Row,
};
use promptlab::ports::{ModelRequest, RunResultStore, RunStatus, TestRunRecord};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn result_row(unit_id: i64, unit_name: &str, latency: Value, tokens: Value) -> Row {
    let mut row = Row::new();
    row.insert("latency_ms".into(), latency);
    row.insert("tokens_used".into(), tokens);
    row.insert("unit_id".into(), json!(unit_id));
    row.insert("unit_name".into(), json!(unit_name));
    row
}

/// Store with two units: gpt-a (100/200 ms) and gpt-b (300/500 ms).
fn seeded_store() -> Arc<InMemoryRunStore> {
    let store = InMemoryRunStore::new();
    store.seed_run(TestRunRecord::new(42, "baseline comparison", RunStatus::Completed));
    store.seed_row(42, result_row(1, "gpt-a", json!(100), json!(50)));
    store.seed_row(42, result_row(1, "gpt-a", json!(200), json!(60)));
    store.seed_row(42, result_row(2, "gpt-b", json!(300), json!(30)));
    store.seed_row(42, result_row(2, "gpt-b", json!(500), json!(40)));
    Arc::new(store)
}

struct Pipeline {
    registry: Arc<ModuleRegistry>,
    service: Arc<ExecutionService>,
    store: Arc<InMemoryRunStore>,
    runner: AnalysisRunner,
}

fn pipeline(store: Arc<InMemoryRunStore>) -> Pipeline {
    init_tracing();
    let registry = Arc::new(ModuleRegistry::new());
    register_builtin_modules(&registry).expect("builtin registration");
    let service = Arc::new(ExecutionService::new(Arc::clone(&registry)));
    let runner = AnalysisRunner::new(store.clone(), Arc::clone(&service));
    Pipeline {
        registry,
        service,
        store,
        runner,
    }
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test]
async fn list_definitions_exposes_builtins_in_stable_order() {
    let pipeline = pipeline(seeded_store());

    let first = pipeline.registry.list_definitions();
    let second = pipeline.registry.list_definitions();

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].module_id, "latency_tokens_summary");
    assert_eq!(first[0].tags, vec!["performance", "cost"]);
}

// =============================================================================
// End-to-end execution
// =============================================================================

#[tokio::test]
async fn runner_executes_builtin_module_end_to_end() {
    let pipeline = pipeline(seeded_store());
    let request = ExecutionRequest::new("latency_tokens_summary", "42");

    let result = pipeline.runner.execute_for_run(&request, Some(7)).await.unwrap();

    // One row per unit, labelled in first-encountered order.
    assert_eq!(result.table.len(), 2);
    assert_eq!(result.table.cell(0, "unit_label"), Some(&json!("unit1")));
    assert_eq!(result.table.cell(0, "unit_name"), Some(&json!("gpt-a")));
    assert_eq!(result.table.cell(0, "avg_latency_ms"), Some(&json!(150.0)));
    assert_eq!(result.table.cell(1, "avg_latency_ms"), Some(&json!(400.0)));

    // The fastest/slowest comparison names both units.
    assert!(result.insights[0].contains("unit1 (gpt-a)"));
    assert!(result.insights[0].contains("unit2 (gpt-b)"));

    let extra = result.extra.as_ref().unwrap();
    assert_eq!(extra["unit_links"].as_array().unwrap().len(), 2);
    assert!(!extra["charts"].as_array().unwrap().is_empty());

    let report = serialize_result(&request.module_id, &result);
    let payload = serde_json::to_value(&report).unwrap();
    assert_eq!(payload["module_id"], json!("latency_tokens_summary"));
    assert_eq!(payload["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_run_produces_fallback_insight() {
    let store = InMemoryRunStore::new();
    store.seed_run(TestRunRecord::new(1, "empty run", RunStatus::Completed));
    let pipeline = pipeline(Arc::new(store));

    let request = ExecutionRequest::new("latency_tokens_summary", "1");
    let result = pipeline.runner.execute_for_run(&request, None).await.unwrap();

    assert!(result.table.is_empty());
    assert_eq!(result.insights.len(), 1);
    assert!(result.insights[0].contains("Insufficient"));

    let extra = result.extra.as_ref().unwrap();
    assert_eq!(extra["charts"], json!([]));
    assert_eq!(extra["unit_links"], json!([]));
}

// =============================================================================
// Error taxonomy
// =============================================================================

#[tokio::test]
async fn unknown_module_is_distinguishable() {
    let pipeline = pipeline(seeded_store());
    let request = ExecutionRequest::new("does_not_exist", "42");

    let err = pipeline.runner.execute_for_run(&request, None).await.unwrap_err();
    assert!(matches!(
        err,
        RunAnalysisError::Analysis(AnalysisError::UnknownModule { .. })
    ));
}

#[tokio::test]
async fn missing_run_is_task_not_found() {
    let pipeline = pipeline(seeded_store());
    let request = ExecutionRequest::new("latency_tokens_summary", "999");

    let err = pipeline.runner.execute_for_run(&request, None).await.unwrap_err();
    assert!(matches!(err, RunAnalysisError::TaskNotFound { task_id: 999 }));
}

#[tokio::test]
async fn garbage_task_id_is_data_load_failure() {
    let pipeline = pipeline(seeded_store());
    let request = ExecutionRequest::new("latency_tokens_summary", "forty-two");

    let err = pipeline.runner.execute_for_run(&request, None).await.unwrap_err();
    assert!(matches!(err, RunAnalysisError::DataLoad { .. }));
}

#[tokio::test]
async fn parameter_validation_failure_names_the_key() {
    init_tracing();
    let registry = Arc::new(ModuleRegistry::new());
    registry
        .register(
            ModuleDefinition::new("needs_param", "Needs a parameter")
                .unwrap()
                .with_parameters(vec![promptlab::domain::analysis::ParameterSpec::number(
                    "threshold",
                    "Threshold",
                )])
                .unwrap(),
            Arc::new(EchoModule),
        )
        .unwrap();
    let service = ExecutionService::new(registry);

    let err = service
        .execute_now(
            &DataTable::default(),
            &AnalysisContext::new("1"),
            &ExecutionRequest::new("needs_param", "1"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "missing required parameter 'threshold'");

    let err = service
        .execute_now(
            &DataTable::default(),
            &AnalysisContext::new("1"),
            &ExecutionRequest::new("needs_param", "1").with_parameter("threshold", json!("high")),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "parameter 'threshold' expects a numeric value");
}

#[tokio::test]
async fn missing_columns_are_reported_together() {
    let pipeline = pipeline(seeded_store());

    // A dataset that carries neither required column.
    let table = DataTable::from_rows(["something_else"], vec![]);
    let err = pipeline
        .service
        .execute_now(
            &table,
            &AnalysisContext::new("7"),
            &ExecutionRequest::new("latency_tokens_summary", "7"),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "dataset is missing required columns: latency_ms, tokens_used"
    );
}

// =============================================================================
// Scheduled execution
// =============================================================================

#[tokio::test]
async fn scheduled_execution_matches_synchronous_result() {
    let pipeline = pipeline(seeded_store());
    let request = ExecutionRequest::new("latency_tokens_summary", "42");

    let direct = pipeline.runner.execute_for_run(&request, None).await.unwrap();

    let store = pipeline.store.clone();
    let job = pipeline
        .service
        .schedule(
            async move {
                store
                    .load_results(42)
                    .await
                    .map_err(|e| AnalysisError::module_failed("loader", e.to_string()))
            },
            AnalysisContext::new("42"),
            request,
        )
        .unwrap();

    let scheduled = job.wait().await.unwrap();
    assert_eq!(direct.table, scheduled.table);
    assert_eq!(direct.insights, scheduled.insights);
}

#[tokio::test]
async fn shutdown_drains_scheduled_jobs() {
    let pipeline = pipeline(seeded_store());

    let mut jobs = Vec::new();
    for _ in 0..4 {
        let store = pipeline.store.clone();
        let job = pipeline
            .service
            .schedule(
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    store
                        .load_results(42)
                        .await
                        .map_err(|e| AnalysisError::module_failed("loader", e.to_string()))
                },
                AnalysisContext::new("42"),
                ExecutionRequest::new("latency_tokens_summary", "42"),
            )
            .unwrap();
        jobs.push(job);
    }

    pipeline.service.shutdown(true).await;

    for job in jobs {
        assert!(job.wait().await.is_ok());
    }

    let err = pipeline
        .service
        .schedule(
            async { Ok(DataTable::default()) },
            AnalysisContext::new("42"),
            ExecutionRequest::new("latency_tokens_summary", "42"),
        )
        .unwrap_err();
    assert!(matches!(err, AnalysisError::ServiceStopped));
}

// =============================================================================
// Custom modules and the model-client seam
// =============================================================================

/// Minimal module used for parameter tests.
struct EchoModule;

#[async_trait]
impl AnalysisHandler for EchoModule {
    async fn execute(
        &self,
        table: &DataTable,
        _params: &JsonMap,
        _context: &AnalysisContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        Ok(AnalysisResult::new(table.clone()))
    }
}

/// Module that asks the injected model client for a run summary.
struct NarratedSummaryModule;

#[async_trait]
impl AnalysisHandler for NarratedSummaryModule {
    async fn execute(
        &self,
        table: &DataTable,
        _params: &JsonMap,
        context: &AnalysisContext,
    ) -> Result<AnalysisResult, AnalysisError> {
        let client = context.model_client.as_ref().ok_or_else(|| {
            AnalysisError::module_failed("narrated_summary", "model client not injected")
        })?;

        let response = client
            .complete(ModelRequest::new(format!("Summarize {} result rows", table.len())))
            .await
            .map_err(|e| AnalysisError::module_failed("narrated_summary", e.to_string()))?;

        let mut usage = JsonMap::new();
        usage.insert("total_tokens".into(), json!(response.usage.total_tokens));

        Ok(AnalysisResult::new(table.clone())
            .with_insights(vec![response.content])
            .with_llm_usage(usage))
    }
}

#[tokio::test]
async fn allow_llm_module_uses_injected_client() {
    init_tracing();
    let registry = Arc::new(ModuleRegistry::new());
    registry
        .register(
            ModuleDefinition::new("narrated_summary", "Narrated summary")
                .unwrap()
                .with_allow_llm(true),
            Arc::new(NarratedSummaryModule),
        )
        .unwrap();
    let service = ExecutionService::new(registry);

    let client = Arc::new(MockModelClient::new().with_response("Two units, gpt-a is faster."));
    let context = AnalysisContext::new("42").with_model_client(client.clone());

    let result = service
        .execute_now(
            &DataTable::default(),
            &context,
            &ExecutionRequest::new("narrated_summary", "42"),
        )
        .await
        .unwrap();

    assert_eq!(result.insights, vec!["Two units, gpt-a is faster.".to_string()]);
    assert!(result.llm_usage.is_some());
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn replace_supports_module_hot_swap() {
    let pipeline = pipeline(seeded_store());

    // Swap the builtin for a stub, then restore it.
    pipeline.registry.replace(
        ModuleDefinition::new("latency_tokens_summary", "Stub").unwrap(),
        Arc::new(EchoModule),
    );
    let definitions = pipeline.registry.list_definitions();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].name, "Stub");

    register_builtin_modules(&pipeline.registry).unwrap();
    let definitions = pipeline.registry.list_definitions();
    assert_eq!(definitions[0].name, "Latency & tokens overview");
}

//! Execution service - orchestrates analysis module invocations.
//!
//! `execute_now` runs a module synchronously on the caller's task;
//! `schedule` submits work to a bounded pool so dataset loading and handler
//! execution happen inside a worker, off the submitting task. The pool is a
//! semaphore with a fixed permit count; job bodies run outside the registry
//! lock.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{oneshot, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::analysis::{
    validate_parameters, AnalysisContext, AnalysisError, AnalysisResult, DataTable,
    ExecutionRequest, ModuleRegistry,
};

/// Default number of concurrent analysis workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Handle to a scheduled analysis job.
///
/// Resolves to the job's outcome once the worker finishes; the submitting
/// task is never blocked by `schedule` itself.
#[derive(Debug)]
pub struct ScheduledAnalysis {
    job_id: Uuid,
    receiver: oneshot::Receiver<Result<AnalysisResult, AnalysisError>>,
}

impl ScheduledAnalysis {
    /// Identifier of the scheduled job.
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Waits for the job's outcome.
    pub async fn wait(self) -> Result<AnalysisResult, AnalysisError> {
        let job_id = self.job_id;
        self.receiver
            .await
            .unwrap_or_else(|_| Err(AnalysisError::JobTerminated {
                job_id: job_id.to_string(),
            }))
    }
}

/// Dispatches analysis requests against a module registry.
pub struct ExecutionService {
    registry: Arc<ModuleRegistry>,
    permits: Arc<Semaphore>,
    jobs: Mutex<Vec<JoinHandle<()>>>,
    stopped: AtomicBool,
    worker_count: usize,
}

impl ExecutionService {
    /// Creates a service with the default worker count.
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self::with_workers(registry, DEFAULT_WORKER_COUNT)
    }

    /// Creates a service with an explicit worker count.
    pub fn with_workers(registry: Arc<ModuleRegistry>, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            registry,
            permits: Arc::new(Semaphore::new(worker_count)),
            jobs: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
            worker_count,
        }
    }

    /// Configured number of concurrent workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Executes a module synchronously on the caller's task.
    ///
    /// Looks up the module, validates parameters, checks required columns,
    /// and invokes the handler. Handler failures propagate unchanged; there
    /// are no retries and no partial results.
    pub async fn execute_now(
        &self,
        table: &DataTable,
        context: &AnalysisContext,
        request: &ExecutionRequest,
    ) -> Result<AnalysisResult, AnalysisError> {
        run_request(&self.registry, table, context, request).await
    }

    /// Schedules a module execution on the worker pool.
    ///
    /// The `loader` future produces the dataset inside the worker, so
    /// enqueueing never blocks on data I/O. Returns a handle resolving to
    /// the job's outcome.
    ///
    /// # Errors
    /// Returns [`AnalysisError::ServiceStopped`] after `shutdown`.
    pub fn schedule<L>(
        &self,
        loader: L,
        context: AnalysisContext,
        request: ExecutionRequest,
    ) -> Result<ScheduledAnalysis, AnalysisError>
    where
        L: Future<Output = Result<DataTable, AnalysisError>> + Send + 'static,
    {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(AnalysisError::ServiceStopped);
        }

        let job_id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let permits = Arc::clone(&self.permits);

        debug!(%job_id, module_id = %request.module_id, "scheduling analysis job");

        let handle = tokio::spawn(async move {
            let outcome = async {
                let _permit = permits
                    .acquire()
                    .await
                    .map_err(|_| AnalysisError::ServiceStopped)?;
                let table = loader.await?;
                run_request(&registry, &table, &context, &request).await
            }
            .await;
            // The caller may have dropped the handle; that is not an error.
            let _ = sender.send(outcome);
        });

        let mut jobs = self.lock_jobs();
        jobs.retain(|job| !job.is_finished());
        jobs.push(handle);
        drop(jobs);

        Ok(ScheduledAnalysis { job_id, receiver })
    }

    /// Stops accepting new jobs.
    ///
    /// With `wait = true`, blocks until every queued and in-flight job has
    /// finished. With `wait = false`, returns immediately; jobs that have not
    /// started yet may still run to completion but must not be relied upon.
    pub async fn shutdown(&self, wait: bool) {
        self.stopped.store(true, Ordering::SeqCst);
        info!(wait, "shutting down analysis execution service");
        if wait {
            let handles: Vec<JoinHandle<()>> = self.lock_jobs().drain(..).collect();
            futures::future::join_all(handles).await;
        }
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The shared execution pipeline: lookup, validate, check columns, dispatch.
async fn run_request(
    registry: &ModuleRegistry,
    table: &DataTable,
    context: &AnalysisContext,
    request: &ExecutionRequest,
) -> Result<AnalysisResult, AnalysisError> {
    let registered = registry.get(&request.module_id)?;
    let params = validate_parameters(registered.definition(), &request.parameters)?;
    registry.ensure_requirements(registered.definition(), table)?;

    debug!(
        module_id = %request.module_id,
        task_id = %context.task_id,
        rows = table.len(),
        "executing analysis module"
    );

    registered.handler().execute(table, &params, context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{
        register_builtin_modules, AnalysisHandler, JsonMap, ModuleDefinition,
    };
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    fn service_with_builtins(workers: usize) -> ExecutionService {
        let registry = Arc::new(ModuleRegistry::new());
        register_builtin_modules(&registry).unwrap();
        ExecutionService::with_workers(registry, workers)
    }

    fn sample_table() -> DataTable {
        let mut table = DataTable::new(["latency_ms", "tokens_used"]);
        let mut row = JsonMap::new();
        row.insert("latency_ms".into(), json!(100));
        row.insert("tokens_used".into(), json!(50));
        table.push_row(row);
        table
    }

    #[tokio::test]
    async fn execute_now_runs_registered_module() {
        let service = service_with_builtins(2);
        let request = ExecutionRequest::new("latency_tokens_summary", "1");
        let result = service
            .execute_now(&sample_table(), &AnalysisContext::new("1"), &request)
            .await
            .unwrap();

        assert_eq!(result.table.len(), 1);
        assert!(!result.insights.is_empty());
    }

    #[tokio::test]
    async fn execute_now_propagates_unknown_module() {
        let service = service_with_builtins(2);
        let request = ExecutionRequest::new("nope", "1");
        let err = service
            .execute_now(&sample_table(), &AnalysisContext::new("1"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownModule { .. }));
    }

    #[tokio::test]
    async fn execute_now_checks_required_columns() {
        let service = service_with_builtins(2);
        let request = ExecutionRequest::new("latency_tokens_summary", "1");
        let table = DataTable::new(["latency_ms"]);
        let err = service
            .execute_now(&table, &AnalysisContext::new("1"), &request)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "dataset is missing required columns: tokens_used"
        );
    }

    struct FailingHandler;

    #[async_trait]
    impl AnalysisHandler for FailingHandler {
        async fn execute(
            &self,
            _table: &DataTable,
            _params: &JsonMap,
            _context: &AnalysisContext,
        ) -> Result<AnalysisResult, AnalysisError> {
            Err(AnalysisError::module_failed("failing", "boom"))
        }
    }

    #[tokio::test]
    async fn handler_errors_pass_through_unchanged() {
        let registry = Arc::new(ModuleRegistry::new());
        registry
            .register(
                ModuleDefinition::new("failing", "Failing").unwrap(),
                Arc::new(FailingHandler),
            )
            .unwrap();
        let service = ExecutionService::new(registry);

        let err = service
            .execute_now(
                &DataTable::default(),
                &AnalysisContext::new("1"),
                &ExecutionRequest::new("failing", "1"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "module 'failing' failed: boom");
    }

    #[tokio::test]
    async fn schedule_defers_loading_and_matches_execute_now() {
        let service = service_with_builtins(2);
        let request = ExecutionRequest::new("latency_tokens_summary", "1");

        let direct = service
            .execute_now(&sample_table(), &AnalysisContext::new("1"), &request)
            .await
            .unwrap();

        let job = service
            .schedule(
                async { Ok(sample_table()) },
                AnalysisContext::new("1"),
                request,
            )
            .unwrap();
        let scheduled = job.wait().await.unwrap();

        assert_eq!(direct, scheduled);
    }

    #[tokio::test]
    async fn schedule_surfaces_loader_failures() {
        let service = service_with_builtins(2);
        let job = service
            .schedule(
                async { Err(AnalysisError::module_failed("loader", "no data")) },
                AnalysisContext::new("1"),
                ExecutionRequest::new("latency_tokens_summary", "1"),
            )
            .unwrap();

        let err = job.wait().await.unwrap_err();
        assert_eq!(err.to_string(), "module 'loader' failed: no data");
    }

    #[tokio::test]
    async fn concurrent_jobs_all_complete() {
        let service = Arc::new(service_with_builtins(2));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let job = service
                .schedule(
                    async {
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        Ok(sample_table())
                    },
                    AnalysisContext::new("1"),
                    ExecutionRequest::new("latency_tokens_summary", "1"),
                )
                .unwrap();
            handles.push(job);
        }

        for job in handles {
            assert!(job.wait().await.is_ok());
        }
    }

    #[tokio::test]
    async fn shutdown_waits_for_inflight_jobs_and_rejects_new_ones() {
        let service = service_with_builtins(1);
        let job = service
            .schedule(
                async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(sample_table())
                },
                AnalysisContext::new("1"),
                ExecutionRequest::new("latency_tokens_summary", "1"),
            )
            .unwrap();

        service.shutdown(true).await;

        let err = service
            .schedule(
                async { Ok(sample_table()) },
                AnalysisContext::new("1"),
                ExecutionRequest::new("latency_tokens_summary", "1"),
            )
            .unwrap_err();
        assert!(matches!(err, AnalysisError::ServiceStopped));

        // The drained job already completed; its handle still resolves.
        assert!(job.wait().await.is_ok());
    }
}

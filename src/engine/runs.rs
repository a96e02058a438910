use crate::config::EngineSettings;
use crate::engine::connections::ConnectionResolver;
use crate::engine::executor::{AbortReason, FlowExecutor, FlowRunOutcome, RunOptions};
use crate::models::{
    ErrorStep, Execution, ExecutionError, ExecutionStatus, FlowDefinition, FlowDocument,
};
use crate::storage::{CredentialCipher, Storage};
use anyhow::Result;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owns the execution lifecycle: creates the `running` record, launches the
/// run out-of-band, applies the single terminal update, and tracks the
/// cancellation token of every in-flight run.
pub struct RunManager {
    storage: Arc<Storage>,
    executor: FlowExecutor,
    resolver: ConnectionResolver,
    settings: EngineSettings,
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl RunManager {
    pub fn new(
        storage: Arc<Storage>,
        cipher: Arc<CredentialCipher>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            executor: FlowExecutor::new(cipher),
            resolver: ConnectionResolver::new(storage.clone()),
            storage,
            settings,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Create the execution record and spawn the run. The caller gets the
    /// execution id immediately; progress is visible only by polling.
    ///
    /// The definition must already be parsed and validated: setup errors that
    /// should produce a 4xx without any record belong to the trigger caller.
    pub fn trigger(
        self: &Arc<Self>,
        flow: FlowDocument,
        definition: FlowDefinition,
        input: Value,
    ) -> Result<String> {
        let execution = Execution::begin(flow.id.clone(), flow.organization_id.clone(), input);
        self.storage.executions.create_execution(&execution)?;

        let cancel = CancellationToken::new();
        self.active
            .lock()
            .unwrap()
            .insert(execution.id.clone(), cancel.clone());

        let execution_id = execution.id.clone();
        info!(execution_id, flow_id = %flow.id, "Execution accepted");

        let manager = self.clone();
        tokio::spawn(async move {
            manager
                .run_to_completion(execution, flow, definition, cancel)
                .await;
        });

        Ok(execution_id)
    }

    /// Synchronous execution for the dev endpoint. No durable record is
    /// written; the caller receives the full outcome directly.
    pub async fn execute_now(
        &self,
        flow: &FlowDocument,
        definition: &FlowDefinition,
        input: Value,
    ) -> Result<FlowRunOutcome> {
        let connections = self.resolver.resolve(definition, &flow.organization_id)?;
        let options = RunOptions::from_settings(&self.settings, CancellationToken::new());
        let execution_id = format!("dev_{}", uuid::Uuid::new_v4());
        Ok(self
            .executor
            .execute(&execution_id, definition, input, &connections, &options)
            .await)
    }

    /// Cancel an in-flight run. Returns false when the id is unknown or the
    /// run already finished (the terminal record stands either way).
    pub fn cancel(&self, execution_id: &str) -> bool {
        match self.active.lock().unwrap().get(execution_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    async fn run_to_completion(
        &self,
        mut execution: Execution,
        flow: FlowDocument,
        definition: FlowDefinition,
        cancel: CancellationToken,
    ) {
        let options = RunOptions::from_settings(&self.settings, cancel);

        match self.resolver.resolve(&definition, &flow.organization_id) {
            Ok(connections) => {
                let outcome = self
                    .executor
                    .execute(
                        &execution.id,
                        &definition,
                        execution.input_payload.clone(),
                        &connections,
                        &options,
                    )
                    .await;

                execution.steps = outcome.steps;
                match outcome.aborted {
                    None => execution.status = ExecutionStatus::Success,
                    Some(AbortReason::Cancelled) => {
                        execution.status = ExecutionStatus::Failed;
                        execution.error = Some(ExecutionError {
                            step: ErrorStep::Cancelled,
                            message: "Execution cancelled by request".to_string(),
                        });
                    }
                    Some(AbortReason::RunTimeout) => {
                        execution.status = ExecutionStatus::Failed;
                        execution.error = Some(ExecutionError {
                            step: ErrorStep::Execution,
                            message: format!(
                                "Run exceeded {}s budget",
                                self.settings.run_timeout_seconds
                            ),
                        });
                    }
                }
            }
            Err(e) => {
                execution.status = ExecutionStatus::Failed;
                execution.error = Some(ExecutionError {
                    step: ErrorStep::Initialization,
                    message: format!("Failed to resolve connections: {e}"),
                });
            }
        }

        execution.finished_at = Some(Utc::now());

        // Persistence failures are logged, not retried; the record stays
        // `running` and the gap is visible to pollers.
        if let Err(e) = self.storage.executions.finish_execution(&execution) {
            error!(execution_id = %execution.id, error = %e, "Failed to persist terminal execution record");
        } else {
            info!(
                execution_id = %execution.id,
                status = ?execution.status,
                steps = execution.steps.len(),
                "Execution finished"
            );
        }

        self.active.lock().unwrap().remove(&execution.id);
    }
}

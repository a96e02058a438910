use crate::config::EngineSettings;
use crate::engine::connections::ResolvedConnections;
use crate::engine::context::ExecutionContext;
use crate::models::{ExecutionStep, FlowDefinition, Node, StepStatus};
use crate::node::{self, RunnerSpec, StepFailure};
use crate::storage::CredentialCipher;
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-run execution budgets and the cancellation token threaded through
/// every node runner.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub node_timeout: Duration,
    pub run_timeout: Duration,
    pub cancel: CancellationToken,
}

impl RunOptions {
    pub fn from_settings(settings: &EngineSettings, cancel: CancellationToken) -> Self {
        Self {
            node_timeout: Duration::from_secs(settings.node_timeout_seconds),
            run_timeout: Duration::from_secs(settings.run_timeout_seconds),
            cancel,
        }
    }
}

/// Why a traversal stopped before reaching the end of the node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Cancelled,
    RunTimeout,
}

/// Result of one traversal. `success` reflects the traversal itself, not the
/// individual nodes: a run that reached the end with failed steps still
/// reports `success = true`, and callers inspect the step log for per-node
/// status.
#[derive(Debug)]
pub struct FlowRunOutcome {
    pub success: bool,
    pub steps: Vec<ExecutionStep>,
    pub aborted: Option<AbortReason>,
}

impl FlowRunOutcome {
    /// Map of node id to step output, in execution order.
    pub fn results_map(&self) -> Value {
        let mut map = serde_json::Map::new();
        for step in &self.steps {
            map.insert(step.node_id.clone(), step.output.clone());
        }
        Value::Object(map)
    }
}

enum NodeAbort {
    Cancelled,
    Timeout,
}

/// Walks a flow's node list and dispatches each node to its runner.
///
/// Scheduling contract: non-monitor nodes run strictly sequentially in list
/// order, then monitor nodes in list order. Edges are never consulted. Each
/// node may read prior outputs from the shared context, so the ordering is a
/// documented design choice, not an artifact of the graph.
pub struct FlowExecutor {
    http: reqwest::Client,
    cipher: Arc<CredentialCipher>,
}

impl FlowExecutor {
    pub fn new(cipher: Arc<CredentialCipher>) -> Self {
        Self {
            http: reqwest::Client::new(),
            cipher,
        }
    }

    pub async fn execute(
        &self,
        execution_id: &str,
        definition: &FlowDefinition,
        input: Value,
        connections: &ResolvedConnections,
        options: &RunOptions,
    ) -> FlowRunOutcome {
        let mut ctx = ExecutionContext::new(execution_id.to_string(), input);
        let deadline = Instant::now() + options.run_timeout;
        let mut steps: Vec<ExecutionStep> = Vec::new();
        let mut aborted = None;

        let (work, monitors): (Vec<&Node>, Vec<&Node>) = definition
            .nodes
            .iter()
            .partition(|n| !n.kind.is_monitor());

        for node in work.into_iter().chain(monitors) {
            if options.cancel.is_cancelled() {
                aborted = Some(AbortReason::Cancelled);
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                aborted = Some(AbortReason::RunTimeout);
                break;
            }
            let budget = options.node_timeout.min(remaining);

            let started_at = Utc::now();
            let dispatched = self
                .run_node(node, &mut ctx, connections, budget, &options.cancel)
                .await;

            let (status, output) = match dispatched {
                Ok(Ok(output)) => (StepStatus::Success, output),
                Ok(Err(failure)) => {
                    warn!(
                        execution_id,
                        node_id = %node.id,
                        error = %failure,
                        "Node failed; continuing with remaining nodes"
                    );
                    (
                        StepStatus::Failed,
                        json!({
                            "success": false,
                            "error": failure.to_string(),
                            "timestamp": Utc::now().to_rfc3339(),
                        }),
                    )
                }
                Err(NodeAbort::Timeout) => {
                    warn!(execution_id, node_id = %node.id, "Node timed out");
                    (
                        StepStatus::Timeout,
                        json!({
                            "success": false,
                            "error": format!("Node execution exceeded {}s budget", budget.as_secs()),
                            "timestamp": Utc::now().to_rfc3339(),
                        }),
                    )
                }
                Err(NodeAbort::Cancelled) => {
                    aborted = Some(AbortReason::Cancelled);
                    break;
                }
            };

            ctx.record_step_result(&node.id, output.clone());
            steps.push(ExecutionStep {
                node_id: node.id.clone(),
                node_name: node.display_name(),
                status,
                started_at,
                finished_at: Utc::now(),
                output,
            });
        }

        info!(
            execution_id,
            steps = steps.len(),
            aborted = ?aborted,
            "Flow traversal finished"
        );

        FlowRunOutcome {
            success: aborted.is_none(),
            steps,
            aborted,
        }
    }

    async fn run_node(
        &self,
        node: &Node,
        ctx: &mut ExecutionContext,
        connections: &ResolvedConnections,
        budget: Duration,
        cancel: &CancellationToken,
    ) -> Result<Result<Value, StepFailure>, NodeAbort> {
        let spec = match RunnerSpec::for_node(node) {
            Ok(spec) => spec,
            Err(failure) => return Ok(Err(failure)),
        };

        match spec {
            RunnerSpec::Trigger => Ok(Ok(node::run_trigger(ctx))),
            RunnerSpec::Passthrough => Ok(Ok(node::run_passthrough(ctx))),
            RunnerSpec::Monitor => Ok(Ok(node::monitor::run(ctx))),
            RunnerSpec::DataTransform(config) => Ok(node::transform::run(&config, ctx)),
            RunnerSpec::LeadValidator(config) => Ok(node::validator::run(&config, ctx)),
            // The only runner that blocks on I/O, so the only one that the
            // per-node budget and mid-flight cancellation apply to.
            RunnerSpec::HttpCall(config) => {
                let call = node::http_call::run(&self.http, &self.cipher, connections, &config);
                tokio::select! {
                    _ = cancel.cancelled() => Err(NodeAbort::Cancelled),
                    outcome = tokio::time::timeout(budget, call) => match outcome {
                        Ok(result) => Ok(result),
                        Err(_) => Err(NodeAbort::Timeout),
                    },
                }
            }
        }
    }
}

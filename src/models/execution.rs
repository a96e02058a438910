use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Durable status of one flow run. `Running` is the only non-terminal state;
/// a record transitions to exactly one of `Success` / `Failed` and is never
/// mutated again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Success,
    Failed,
}

/// Outcome of a single node within a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
    /// The node exceeded its execution budget and was abandoned.
    Timeout,
}

/// Where in the lifecycle a run-level failure happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStep {
    /// Before any node executed: flow lookup, definition parse, connection
    /// resolution.
    Initialization,
    /// During or after traversal: run timeout or an error escaping the
    /// executor.
    Execution,
    /// The run was cancelled through the API.
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionError {
    pub step: ErrorStep,
    pub message: String,
}

/// One entry of the step log, appended in node-processing order:
/// non-monitor nodes in list order, then monitors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub node_id: String,
    pub node_name: String,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub output: Value,
}

/// The durable record of one flow run, polled by callers via its id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: String,
    pub flow_id: String,
    pub organization_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub input_payload: Value,
    #[serde(rename = "stepsLog")]
    pub steps: Vec<ExecutionStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
}

impl Execution {
    /// Fresh `Running` record with the trigger input captured verbatim.
    pub fn begin(flow_id: String, organization_id: String, input_payload: Value) -> Self {
        Self {
            id: format!("exec_{}", uuid::Uuid::new_v4()),
            flow_id,
            organization_id,
            status: ExecutionStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            input_payload,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status != ExecutionStatus::Running
    }
}

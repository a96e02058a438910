pub mod http_call;
pub mod monitor;
pub mod transform;
pub mod validator;

use crate::engine::context::ExecutionContext;
use crate::models::{Node, NodeKind};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;

/// A node-level failure. Contained to that node's step: the executor records
/// it and moves on to the next node.
#[derive(Debug, Clone, Error)]
pub enum StepFailure {
    #[error("Connection '{0}' referenced by this node was not found")]
    ConnectionMissing(String),
    #[error("Invalid node configuration: {0}")]
    InvalidConfig(String),
    #[error("{0}")]
    Runtime(String),
}

/// The closed runner set, with each variant carrying its typed config.
/// Parsed from a node's raw `data.config` at dispatch time, so a bad config
/// is a per-node failure rather than a run-level one.
#[derive(Debug, Clone)]
pub enum RunnerSpec {
    Trigger,
    HttpCall(http_call::HttpCallConfig),
    DataTransform(transform::TransformConfig),
    LeadValidator(validator::ValidatorConfig),
    Monitor,
    /// Unrecognized node types execute as a pass-through no-op.
    Passthrough,
}

impl RunnerSpec {
    pub fn for_node(node: &Node) -> Result<Self, StepFailure> {
        match node.kind {
            NodeKind::Trigger => Ok(Self::Trigger),
            NodeKind::HttpRequest | NodeKind::ApiCall => {
                parse_config(&node.data.config).map(Self::HttpCall)
            }
            NodeKind::DataTransform => parse_config(&node.data.config).map(Self::DataTransform),
            NodeKind::LeadValidator => parse_config(&node.data.config).map(Self::LeadValidator),
            NodeKind::Monitor => Ok(Self::Monitor),
            NodeKind::Unknown => Ok(Self::Passthrough),
        }
    }
}

fn parse_config<T: DeserializeOwned + Default>(raw: &Value) -> Result<T, StepFailure> {
    if raw.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(raw.clone()).map_err(|e| StepFailure::InvalidConfig(e.to_string()))
}

pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Trigger runner: echoes the trigger input payload. No side effects.
pub fn run_trigger(ctx: &ExecutionContext) -> Value {
    json!({
        "success": true,
        "payload": ctx.input.clone(),
        "timestamp": timestamp(),
    })
}

/// Default runner for unknown node types: echoes the current input so a flow
/// authored against a newer node set degrades instead of failing outright.
pub fn run_passthrough(ctx: &ExecutionContext) -> Value {
    json!({
        "success": true,
        "data": ctx.current_data(),
        "skipped": true,
        "timestamp": timestamp(),
    })
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// A stored flow: metadata plus the graph exactly as the editor authored it.
///
/// The raw `definition` is kept as JSON and only parsed into a
/// [`FlowDefinition`] when a run is set up, so a malformed graph is a setup
/// error for that run rather than a write-time rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowDocument {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub enabled: bool,
    pub definition: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlowDocument {
    pub fn new(organization_id: String, name: String, definition: Value) -> Self {
        let now = Utc::now();
        Self {
            id: format!("flow_{}", uuid::Uuid::new_v4()),
            organization_id,
            name,
            alias: None,
            enabled: true,
            definition,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum FlowDefinitionError {
    #[error("Invalid flow definition: nodes array is required")]
    MissingNodes,
    #[error("Invalid flow definition: {0}")]
    Malformed(String),
    #[error("Invalid flow definition: duplicate node id '{0}'")]
    DuplicateNodeId(String),
    #[error("Invalid flow definition: edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },
}

/// The executable shape of a flow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowDefinition {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl FlowDefinition {
    /// Parse and validate a raw definition. Every run goes through this
    /// before any node executes.
    pub fn parse(raw: &Value) -> Result<Self, FlowDefinitionError> {
        match raw.get("nodes") {
            Some(nodes) if nodes.is_array() => {}
            _ => return Err(FlowDefinitionError::MissingNodes),
        }
        let definition: FlowDefinition = serde_json::from_value(raw.clone())
            .map_err(|e| FlowDefinitionError::Malformed(e.to_string()))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Node ids must be unique and every edge endpoint must exist.
    /// Edges are informational only: execution order is list order with
    /// monitors last, never derived from the edge set.
    pub fn validate(&self) -> Result<(), FlowDefinitionError> {
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(FlowDefinitionError::DuplicateNodeId(node.id.clone()));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.source, &edge.target] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(FlowDefinitionError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Display label for the step log: the editor-assigned name, or the id.
    pub fn display_name(&self) -> String {
        self.data.name.clone().unwrap_or_else(|| self.id.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Value,
}

/// Closed set of node kinds. Unrecognized type strings deserialize to
/// `Unknown`, which executes as a pass-through rather than failing the flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Trigger,
    HttpRequest,
    ApiCall,
    DataTransform,
    LeadValidator,
    Monitor,
    #[serde(other)]
    Unknown,
}

impl NodeKind {
    /// The HTTP-call family: both spellings share one runner and may
    /// reference a stored connection.
    pub fn is_http_call(&self) -> bool {
        matches!(self, NodeKind::HttpRequest | NodeKind::ApiCall)
    }

    pub fn is_monitor(&self) -> bool {
        matches!(self, NodeKind::Monitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    pub target: String,
}

pub mod connection;
pub mod execution;
pub mod flow;

pub use connection::{Connection, ConnectionSummary, ConnectionType};
pub use execution::{
    ErrorStep, Execution, ExecutionError, ExecutionStatus, ExecutionStep, StepStatus,
};
pub use flow::{Edge, FlowDefinition, FlowDefinitionError, FlowDocument, Node, NodeData, NodeKind};

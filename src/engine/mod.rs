pub mod connections;
pub mod context;
pub mod executor;
pub mod runs;

pub use connections::{ConnectionResolver, ResolvedConnections};
pub use context::ExecutionContext;
pub use executor::{AbortReason, FlowExecutor, FlowRunOutcome, RunOptions};
pub use runs::RunManager;

pub mod connection;
pub mod encryption;
pub mod execution;
pub mod flow;

use anyhow::Result;
use redb::Database;
use std::sync::Arc;

pub use connection::ConnectionStorage;
pub use encryption::CredentialCipher;
pub use execution::ExecutionStorage;
pub use flow::FlowStorage;

/// Document store façade over a single redb database. Constructed explicitly
/// at startup and injected into the engine and API layers.
pub struct Storage {
    pub flows: FlowStorage,
    pub connections: ConnectionStorage,
    pub executions: ExecutionStorage,
}

impl Storage {
    pub fn new(path: &str) -> Result<Self> {
        let db = Arc::new(Database::create(path)?);

        let flows = FlowStorage::new(db.clone())?;
        let connections = ConnectionStorage::new(db.clone())?;
        let executions = ExecutionStorage::new(db)?;

        Ok(Self {
            flows,
            connections,
            executions,
        })
    }
}

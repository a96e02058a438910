use crate::models::Connection;
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

pub const CONNECTION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("connections");

/// Store for credential bundles. Credentials arrive here already encrypted;
/// this layer never sees plaintext.
pub struct ConnectionStorage {
    db: Arc<Database>,
}

impl ConnectionStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(CONNECTION_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn create_connection(&self, connection: &Connection) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONNECTION_TABLE)?;
            let json_bytes = serde_json::to_vec(connection)?;
            table.insert(connection.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Fetch a connection scoped to the calling organization. An id that
    /// exists under another organization resolves to `None`.
    pub fn get_connection(&self, organization_id: &str, id: &str) -> Result<Option<Connection>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONNECTION_TABLE)?;

        if let Some(value) = table.get(id)? {
            let connection: Connection = serde_json::from_slice(value.value())?;
            if connection.organization_id == organization_id {
                return Ok(Some(connection));
            }
        }
        Ok(None)
    }

    pub fn list_connections(&self, organization_id: &str) -> Result<Vec<Connection>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CONNECTION_TABLE)?;

        let mut connections = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let connection: Connection = serde_json::from_slice(value.value())?;
            if connection.organization_id == organization_id {
                connections.push(connection);
            }
        }

        Ok(connections)
    }

    pub fn delete_connection(&self, organization_id: &str, id: &str) -> Result<()> {
        if self.get_connection(organization_id, id)?.is_none() {
            return Err(anyhow::anyhow!("Connection not found"));
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(CONNECTION_TABLE)?;
            table.remove(id)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

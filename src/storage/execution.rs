use crate::models::Execution;
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

pub const EXECUTION_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("executions");

/// Store for execution records. Each record is written exactly twice: once at
/// creation (`running`) and once at the terminal update. Records are never
/// deleted by the engine.
pub struct ExecutionStorage {
    db: Arc<Database>,
}

impl ExecutionStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(EXECUTION_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn create_execution(&self, execution: &Execution) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EXECUTION_TABLE)?;

            if table.get(execution.id.as_str())?.is_some() {
                return Err(anyhow::anyhow!("Execution {} already exists", execution.id));
            }

            let json_bytes = serde_json::to_vec(execution)?;
            table.insert(execution.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Terminal update. Rejects a second terminal write so a record can only
    /// ever transition `running -> success` or `running -> failed`.
    pub fn finish_execution(&self, execution: &Execution) -> Result<()> {
        if !execution.is_terminal() {
            return Err(anyhow::anyhow!(
                "Refusing to finish execution {} with non-terminal status",
                execution.id
            ));
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(EXECUTION_TABLE)?;

            let Some(existing) = table.get(execution.id.as_str())? else {
                return Err(anyhow::anyhow!("Execution {} not found", execution.id));
            };
            let stored: Execution = serde_json::from_slice(existing.value())?;
            if stored.is_terminal() {
                return Err(anyhow::anyhow!(
                    "Execution {} already finished as {:?}",
                    execution.id,
                    stored.status
                ));
            }
            drop(existing);

            let json_bytes = serde_json::to_vec(execution)?;
            table.insert(execution.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_execution(&self, id: &str) -> Result<Option<Execution>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXECUTION_TABLE)?;

        if let Some(value) = table.get(id)? {
            let execution: Execution = serde_json::from_slice(value.value())?;
            Ok(Some(execution))
        } else {
            Ok(None)
        }
    }

    pub fn list_executions_for_flow(
        &self,
        organization_id: &str,
        flow_id: &str,
    ) -> Result<Vec<Execution>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EXECUTION_TABLE)?;

        let mut executions = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let execution: Execution = serde_json::from_slice(value.value())?;
            if execution.organization_id == organization_id && execution.flow_id == flow_id {
                executions.push(execution);
            }
        }
        executions.sort_by_key(|e| e.started_at);

        Ok(executions)
    }
}

use crate::models::FlowDocument;
use anyhow::Result;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::sync::Arc;

pub const FLOW_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("flows");

pub struct FlowStorage {
    db: Arc<Database>,
}

impl FlowStorage {
    pub fn new(db: Arc<Database>) -> Result<Self> {
        let write_txn = db.begin_write()?;
        write_txn.open_table(FLOW_TABLE)?;
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub fn create_flow(&self, flow: &FlowDocument) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FLOW_TABLE)?;
            let json_bytes = serde_json::to_vec(flow)?;
            table.insert(flow.id.as_str(), json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_flow(&self, id: &str) -> Result<Option<FlowDocument>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FLOW_TABLE)?;

        if let Some(value) = table.get(id)? {
            let flow: FlowDocument = serde_json::from_slice(value.value())?;
            Ok(Some(flow))
        } else {
            Ok(None)
        }
    }

    /// Resolve a flow by id or by its human-readable alias. Used by the
    /// dev-execute endpoint; a pure read, no backfill side effects.
    pub fn get_flow_by_identifier(&self, identifier: &str) -> Result<Option<FlowDocument>> {
        if let Some(flow) = self.get_flow(identifier)? {
            return Ok(Some(flow));
        }

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FLOW_TABLE)?;
        for item in table.iter()? {
            let (_, value) = item?;
            let flow: FlowDocument = serde_json::from_slice(value.value())?;
            if flow.alias.as_deref() == Some(identifier) {
                return Ok(Some(flow));
            }
        }
        Ok(None)
    }

    pub fn list_flows(&self, organization_id: &str) -> Result<Vec<FlowDocument>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(FLOW_TABLE)?;

        let mut flows = Vec::new();
        for item in table.iter()? {
            let (_, value) = item?;
            let flow: FlowDocument = serde_json::from_slice(value.value())?;
            if flow.organization_id == organization_id {
                flows.push(flow);
            }
        }

        Ok(flows)
    }

    pub fn update_flow(&self, id: &str, flow: &FlowDocument) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FLOW_TABLE)?;

            if table.get(id)?.is_none() {
                return Err(anyhow::anyhow!("Flow not found"));
            }

            let json_bytes = serde_json::to_vec(flow)?;
            table.insert(id, json_bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn delete_flow(&self, id: &str) -> Result<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FLOW_TABLE)?;

            if table.get(id)?.is_none() {
                return Err(anyhow::anyhow!("Flow not found"));
            }

            table.remove(id)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Explicit migration: assign a slug alias to every flow of the
    /// organization that lacks one. Returns `(flow_id, alias)` pairs for the
    /// flows that were touched.
    pub fn backfill_aliases(&self, organization_id: &str) -> Result<Vec<(String, String)>> {
        let mut taken: Vec<String> = Vec::new();
        let mut pending: Vec<FlowDocument> = Vec::new();

        {
            let read_txn = self.db.begin_read()?;
            let table = read_txn.open_table(FLOW_TABLE)?;
            for item in table.iter()? {
                let (_, value) = item?;
                let flow: FlowDocument = serde_json::from_slice(value.value())?;
                match &flow.alias {
                    Some(alias) => taken.push(alias.clone()),
                    None if flow.organization_id == organization_id => pending.push(flow),
                    None => {}
                }
            }
        }

        let mut assigned = Vec::new();
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(FLOW_TABLE)?;
            for mut flow in pending {
                let mut alias = slugify(&flow.name);
                if alias.is_empty() || taken.iter().any(|t| t == &alias) {
                    let suffix = &flow.id[flow.id.len().saturating_sub(8)..];
                    alias = format!("{}-{}", if alias.is_empty() { "flow" } else { &alias }, suffix);
                }
                taken.push(alias.clone());
                flow.alias = Some(alias.clone());
                flow.updated_at = chrono::Utc::now();

                let json_bytes = serde_json::to_vec(&flow)?;
                table.insert(flow.id.as_str(), json_bytes.as_slice())?;
                assigned.push((flow.id.clone(), alias));
            }
        }
        write_txn.commit()?;

        Ok(assigned)
    }
}

/// Lowercase, alphanumeric, hyphen-separated slug of a flow name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_hyphen = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

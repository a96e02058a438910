use crate::models::{Connection, FlowDefinition};
use crate::storage::Storage;
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

/// Connections referenced by a flow, fetched ahead of execution.
///
/// Credentials inside are still encrypted; decryption happens in the HTTP
/// runner at the moment a request is built.
#[derive(Debug, Default)]
pub struct ResolvedConnections {
    connections: HashMap<String, Connection>,
    missing: HashSet<String>,
}

impl ResolvedConnections {
    pub fn get(&self, id: &str) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Ids that were referenced but did not resolve for this organization.
    /// A node using one of these fails its step with a connection-missing
    /// error instead of silently running without credentials.
    pub fn missing(&self) -> &HashSet<String> {
        &self.missing
    }

    pub fn resolved_count(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub fn insert_for_test(&mut self, connection: Connection) {
        self.connections.insert(connection.id.clone(), connection);
    }
}

/// Fetches the connection documents a flow references, scoped to the calling
/// organization.
pub struct ConnectionResolver {
    storage: Arc<Storage>,
}

impl ConnectionResolver {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn resolve(
        &self,
        definition: &FlowDefinition,
        organization_id: &str,
    ) -> Result<ResolvedConnections> {
        let mut referenced: Vec<String> = Vec::new();
        for node in &definition.nodes {
            if !node.kind.is_http_call() {
                continue;
            }
            if let Some(id) = node.data.config.get("connectionId").and_then(|v| v.as_str())
                && !referenced.iter().any(|r| r == id)
            {
                referenced.push(id.to_string());
            }
        }

        let mut resolved = ResolvedConnections::default();
        for id in referenced {
            match self.storage.connections.get_connection(organization_id, &id)? {
                Some(connection) => {
                    resolved.connections.insert(id, connection);
                }
                None => {
                    warn!(connection_id = %id, "Referenced connection not found");
                    resolved.missing.insert(id);
                }
            }
        }

        Ok(resolved)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a connection's decrypted credentials are applied to an outbound call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Bearer token in the `Authorization` header.
    ApiKey,
    /// HTTP basic auth from `username` / `password`.
    Basic,
    /// Arbitrary header name/value pair.
    CustomHeader,
}

/// A stored credential bundle, referenced by id from HTTP node configs.
///
/// `credentials` is AES-256-GCM ciphertext (base64). It stays encrypted
/// through storage and connection resolution; only the HTTP runner decrypts,
/// at request-build time, and the plaintext never reaches a log or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub connection_type: ConnectionType,
    pub credentials: String,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        organization_id: String,
        name: String,
        connection_type: ConnectionType,
        encrypted_credentials: String,
    ) -> Self {
        Self {
            id: format!("conn_{}", uuid::Uuid::new_v4()),
            organization_id,
            name,
            connection_type,
            credentials: encrypted_credentials,
            created_at: Utc::now(),
        }
    }
}

/// Listing view of a connection. Never carries credentials, encrypted or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSummary {
    pub id: String,
    pub name: String,
    pub connection_type: ConnectionType,
    pub created_at: DateTime<Utc>,
}

impl From<&Connection> for ConnectionSummary {
    fn from(connection: &Connection) -> Self {
        Self {
            id: connection.id.clone(),
            name: connection.name.clone(),
            connection_type: connection.connection_type,
            created_at: connection.created_at,
        }
    }
}

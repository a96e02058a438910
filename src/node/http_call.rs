use super::{StepFailure, timestamp};
use crate::engine::connections::ResolvedConnections;
use crate::models::ConnectionType;
use crate::storage::CredentialCipher;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::debug;

/// Config for the `httpRequest` / `apiCall` node family.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HttpCallConfig {
    /// No URL means the node is still being wired up in the editor; the
    /// runner substitutes a synthetic response instead of failing.
    pub url: Option<String>,
    pub method: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<Value>,
    pub connection_id: Option<String>,
}

/// Decrypted credential shapes, per connection type. Only ever materialized
/// on this function's stack while the request is being built.
#[derive(Deserialize)]
struct ApiKeyCredentials {
    token: String,
}

#[derive(Deserialize)]
struct BasicCredentials {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct HeaderCredentials {
    name: String,
    value: String,
}

pub async fn run(
    client: &reqwest::Client,
    cipher: &CredentialCipher,
    connections: &ResolvedConnections,
    config: &HttpCallConfig,
) -> Result<Value, StepFailure> {
    let Some(url) = config.url.as_deref() else {
        return Ok(simulated_response());
    };

    let method_name = config.method.as_deref().unwrap_or("GET");
    let method = reqwest::Method::from_bytes(method_name.to_uppercase().as_bytes())
        .map_err(|_| StepFailure::InvalidConfig(format!("Unsupported HTTP method: {method_name}")))?;

    let mut request = client.request(method, url);
    for (name, value) in &config.headers {
        request = request.header(name, value);
    }
    if let Some(body) = &config.body {
        request = request.json(body);
    }

    if let Some(connection_id) = config.connection_id.as_deref() {
        let Some(connection) = connections.get(connection_id) else {
            return Err(StepFailure::ConnectionMissing(connection_id.to_string()));
        };

        let plaintext = cipher
            .decrypt_string(&connection.credentials)
            .map_err(|_| StepFailure::Runtime("Failed to decrypt connection credentials".into()))?;
        request = apply_credentials(request, connection.connection_type, &plaintext)?;
        debug!(connection_id, "Injected connection credentials");
    }

    let response = request
        .send()
        .await
        .map_err(|e| StepFailure::Runtime(format!("HTTP request failed: {e}")))?;

    let status = response.status().as_u16();
    let mut headers = Map::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_string(), Value::String(v.to_string()));
        }
    }

    let text = response
        .text()
        .await
        .map_err(|e| StepFailure::Runtime(format!("Failed to read response body: {e}")))?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    Ok(json!({
        "success": true,
        "status": status,
        "headers": Value::Object(headers),
        "body": body,
        "timestamp": timestamp(),
    }))
}

fn apply_credentials(
    request: reqwest::RequestBuilder,
    connection_type: ConnectionType,
    plaintext: &str,
) -> Result<reqwest::RequestBuilder, StepFailure> {
    let malformed = |_| StepFailure::Runtime("Stored connection credentials are malformed".into());
    match connection_type {
        ConnectionType::ApiKey => {
            let creds: ApiKeyCredentials = serde_json::from_str(plaintext).map_err(malformed)?;
            Ok(request.bearer_auth(creds.token))
        }
        ConnectionType::Basic => {
            let creds: BasicCredentials = serde_json::from_str(plaintext).map_err(malformed)?;
            Ok(request.basic_auth(creds.username, Some(creds.password)))
        }
        ConnectionType::CustomHeader => {
            let creds: HeaderCredentials = serde_json::from_str(plaintext).map_err(malformed)?;
            Ok(request.header(creds.name, creds.value))
        }
    }
}

/// Deterministic stand-in for nodes not yet wired to a real endpoint.
fn simulated_response() -> Value {
    json!({
        "success": true,
        "simulated": true,
        "status": 200,
        "body": {"message": "No URL configured; returning simulated response"},
        "timestamp": timestamp(),
    })
}

use crate::api::auth::OrgIdentity;
use crate::api::state::AppState;
use crate::api_response::{error, success, success_with_message};
use crate::models::{Connection, ConnectionSummary, ConnectionType};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

type ApiError = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub name: String,
    pub connection_type: ConnectionType,
    /// Plaintext credential object; encrypted before it touches storage and
    /// never echoed back.
    pub credentials: Value,
}

// POST /api/connections
pub async fn create_connection(
    State(state): State<AppState>,
    org: OrgIdentity,
    Json(payload): Json<CreateConnectionRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    if payload.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            error("Connection name must not be empty".to_string()),
        ));
    }
    if !payload.credentials.is_object() {
        return Err((
            StatusCode::BAD_REQUEST,
            error("Credentials must be a JSON object".to_string()),
        ));
    }

    let encrypted = state
        .cipher
        .encrypt_string(&payload.credentials.to_string())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, error(e.to_string())))?;

    let connection = Connection::new(
        org.organization_id,
        payload.name,
        payload.connection_type,
        encrypted,
    );
    state
        .storage
        .connections
        .create_connection(&connection)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, error(e.to_string())))?;

    Ok((
        StatusCode::CREATED,
        success_with_message(
            ConnectionSummary::from(&connection),
            "Connection created".to_string(),
        ),
    ))
}

// GET /api/connections — listing never exposes credentials.
pub async fn list_connections(
    State(state): State<AppState>,
    org: OrgIdentity,
) -> Result<Json<Value>, ApiError> {
    let connections = state
        .storage
        .connections
        .list_connections(&org.organization_id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, error(e.to_string())))?;

    let summaries: Vec<ConnectionSummary> =
        connections.iter().map(ConnectionSummary::from).collect();
    Ok(success(summaries))
}

// DELETE /api/connections/{id}
pub async fn delete_connection(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state
        .storage
        .connections
        .get_connection(&org.organization_id, &id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, error(e.to_string())))?
        .is_none()
    {
        return Err((
            StatusCode::NOT_FOUND,
            error("Connection not found".to_string()),
        ));
    }

    state
        .storage
        .connections
        .delete_connection(&org.organization_id, &id)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, error(e.to_string())))?;
    Ok(success_with_message(json!({}), format!("Connection {id} deleted")))
}

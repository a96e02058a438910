use crate::api::auth::OrgIdentity;
use crate::api::state::AppState;
use crate::api_response::{error, success, success_with_message};
use crate::models::{FlowDefinition, FlowDocument, StepStatus};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, error(message.into()))
}

fn not_found(message: impl Into<String>) -> ApiError {
    (StatusCode::NOT_FOUND, error(message.into()))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, error(e.to_string()))
}

/// Load a flow and enforce the organization scope. Foreign flows are
/// indistinguishable from absent ones.
fn load_scoped_flow(state: &AppState, org: &OrgIdentity, id: &str) -> Result<FlowDocument, ApiError> {
    state
        .storage
        .flows
        .get_flow(id)
        .map_err(internal)?
        .filter(|f| f.organization_id == org.organization_id)
        .ok_or_else(|| not_found("Flow not found"))
}

#[derive(Debug, Deserialize)]
pub struct CreateFlowRequest {
    pub name: String,
    pub definition: Value,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// GET /api/flows
pub async fn list_flows(
    State(state): State<AppState>,
    org: OrgIdentity,
) -> Result<Json<Value>, ApiError> {
    let flows = state
        .storage
        .flows
        .list_flows(&org.organization_id)
        .map_err(internal)?;
    Ok(success(flows))
}

// POST /api/flows
pub async fn create_flow(
    State(state): State<AppState>,
    org: OrgIdentity,
    Json(payload): Json<CreateFlowRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut flow = FlowDocument::new(org.organization_id, payload.name, payload.definition);
    flow.alias = payload.alias;
    flow.enabled = payload.enabled;

    state.storage.flows.create_flow(&flow).map_err(internal)?;
    Ok((
        StatusCode::CREATED,
        success_with_message(json!({"id": flow.id}), format!("Flow {} saved!", flow.name)),
    ))
}

// GET /api/flows/{id}
pub async fn get_flow(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let flow = load_scoped_flow(&state, &org, &id)?;
    Ok(success(flow))
}

#[derive(Debug, Deserialize)]
pub struct UpdateFlowRequest {
    pub name: Option<String>,
    pub definition: Option<Value>,
    pub enabled: Option<bool>,
}

// PUT /api/flows/{id}
pub async fn update_flow(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
    Json(payload): Json<UpdateFlowRequest>,
) -> Result<Json<Value>, ApiError> {
    let mut flow = load_scoped_flow(&state, &org, &id)?;
    if let Some(name) = payload.name {
        flow.name = name;
    }
    if let Some(definition) = payload.definition {
        flow.definition = definition;
    }
    if let Some(enabled) = payload.enabled {
        flow.enabled = enabled;
    }
    flow.updated_at = Utc::now();

    state.storage.flows.update_flow(&id, &flow).map_err(internal)?;
    Ok(success_with_message(json!({}), format!("Flow {id} updated!")))
}

// DELETE /api/flows/{id}
pub async fn delete_flow(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    load_scoped_flow(&state, &org, &id)?;
    state.storage.flows.delete_flow(&id).map_err(internal)?;
    Ok(success_with_message(json!({}), format!("Flow {id} deleted!")))
}

// POST /api/flows/{id}/run
//
// Setup errors fail fast here, before any execution record exists. On
// success the caller gets a 202 with the execution id; everything after
// that is visible only by polling.
pub async fn run_flow(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
    payload: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let flow = load_scoped_flow(&state, &org, &id)?;
    if !flow.enabled {
        return Err(bad_request("Flow is disabled"));
    }

    // An absent body and a body without the field are the same caller error.
    let Some(input) = payload.and_then(|Json(body)| body.get("inputPayload").cloned()) else {
        return Err(bad_request("Missing inputPayload"));
    };

    let definition = FlowDefinition::parse(&flow.definition)
        .map_err(|e| bad_request(e.to_string()))?;

    let execution_id = state.runs.trigger(flow, definition, input).map_err(internal)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "executionId": execution_id,
            "status": "running",
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct RunQuery {
    #[serde(rename = "executionId")]
    pub execution_id: Option<String>,
}

// GET /api/flows/{id}/run?executionId=...
pub async fn get_run(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
    Query(query): Query<RunQuery>,
) -> Result<Json<Value>, ApiError> {
    let Some(execution_id) = query.execution_id else {
        return Err(bad_request("Missing executionId query parameter"));
    };

    let execution = state
        .storage
        .executions
        .get_execution(&execution_id)
        .map_err(internal)?
        .filter(|e| e.organization_id == org.organization_id && e.flow_id == id)
        .ok_or_else(|| not_found("Execution not found"))?;

    Ok(success(execution))
}

// POST /api/executions/{id}/cancel
pub async fn cancel_execution(
    State(state): State<AppState>,
    org: OrgIdentity,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let execution = state
        .storage
        .executions
        .get_execution(&id)
        .map_err(internal)?
        .filter(|e| e.organization_id == org.organization_id)
        .ok_or_else(|| not_found("Execution not found"))?;

    if execution.is_terminal() {
        return Ok(success_with_message(
            json!({"cancelled": false}),
            "Execution already finished".to_string(),
        ));
    }

    let cancelled = state.runs.cancel(&id);
    Ok(success_with_message(
        json!({"cancelled": cancelled}),
        if cancelled {
            "Cancellation requested".to_string()
        } else {
            "Execution already finished".to_string()
        },
    ))
}

// POST /api/flows/backfill-aliases
//
// Explicit migration: alias assignment used to happen as a side effect of
// dev-execute lookups; it is now only ever done here.
pub async fn backfill_aliases(
    State(state): State<AppState>,
    org: OrgIdentity,
) -> Result<Json<Value>, ApiError> {
    let assigned = state
        .storage
        .flows
        .backfill_aliases(&org.organization_id)
        .map_err(internal)?;

    let assigned: Vec<Value> = assigned
        .into_iter()
        .map(|(flow_id, alias)| json!({"flowId": flow_id, "alias": alias}))
        .collect();
    Ok(success_with_message(
        json!({"assigned": assigned}),
        "Alias backfill complete".to_string(),
    ))
}

/// Default input for dev-execute when the caller supplies none.
fn sample_lead() -> Value {
    json!({
        "leadName": "Sample Lead",
        "email": "sample@lead.dev",
        "score": 50,
        "source": "dev-execute",
    })
}

// POST /api/flows/dev-execute/{identifier}
//
// Unauthenticated development variant: resolves by id or alias, synthesizes
// input when none is supplied, executes synchronously, and returns the full
// step-result map plus a summary. Strictly read-only against the store.
pub async fn dev_execute(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    payload: Option<Json<Value>>,
) -> Result<Json<Value>, ApiError> {
    let flow = state
        .storage
        .flows
        .get_flow_by_identifier(&identifier)
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("Flow '{identifier}' not found")))?;

    let input = payload
        .and_then(|Json(body)| body.get("inputPayload").cloned())
        .unwrap_or_else(sample_lead);

    let definition = FlowDefinition::parse(&flow.definition)
        .map_err(|e| bad_request(e.to_string()))?;

    let outcome = state
        .runs
        .execute_now(&flow, &definition, input)
        .await
        .map_err(internal)?;

    let successful = outcome
        .steps
        .iter()
        .filter(|s| s.status == StepStatus::Success)
        .count();
    let api_calls = definition
        .nodes
        .iter()
        .filter(|n| n.kind.is_http_call())
        .count();

    Ok(Json(json!({
        "status": "success",
        "flowId": flow.id,
        "flowName": flow.name,
        "results": outcome.results_map(),
        "summary": {
            "totalNodes": definition.nodes.len(),
            "successfulNodes": successful,
            "failedNodes": outcome.steps.len() - successful,
            "apiCalls": api_calls,
        },
    })))
}

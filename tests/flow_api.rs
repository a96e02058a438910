use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use leadflow::config::EngineSettings;
use leadflow::{AppCore, api};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;

const ORG: &str = "org_test";

fn test_app() -> (Router, AppCore, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("leadflow.db");
    let core = AppCore::new(
        db_path.to_str().unwrap(),
        "integration-test-master-key",
        EngineSettings::default(),
    )
    .unwrap();
    let app = api::router(core.app_state());
    (app, core, temp_dir)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    org: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(org) = org {
        builder = builder.header("x-organization-id", org);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

async fn create_flow(app: &Router, name: &str, definition: Value) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/flows",
        Some(ORG),
        Some(json!({"name": name, "definition": definition})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn poll_terminal(app: &Router, flow_id: &str, execution_id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = send(
            app,
            "GET",
            &format!("/api/flows/{flow_id}/run?executionId={execution_id}"),
            Some(ORG),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let execution = &body["data"];
        if execution["status"] != json!("running") {
            return execution.clone();
        }
        assert!(
            execution.get("finishedAt").is_none(),
            "running execution must have no finishedAt"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("execution {execution_id} never finished");
}

fn pure_definition() -> Value {
    json!({
        "nodes": [
            {"id": "t1", "type": "trigger", "data": {"name": "Inbound lead"}},
            {"id": "x1", "type": "dataTransform"},
            {"id": "v1", "type": "leadValidator"},
            {"id": "m1", "type": "monitor", "data": {"name": "Debug"}}
        ],
        "edges": [
            {"id": "e1", "source": "t1", "target": "x1"},
            {"id": "e2", "source": "x1", "target": "v1"}
        ]
    })
}

#[tokio::test]
async fn run_flow_returns_202_and_finishes_with_ordered_step_log() {
    let (app, _core, _tmp) = test_app();
    let flow_id = create_flow(&app, "Lead intake", pure_definition()).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        Some(json!({"inputPayload": {"leadName": "Acme", "email": "SALES@acme.io", "score": 88}})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(body["status"], json!("running"));
    let execution_id = body["executionId"].as_str().unwrap().to_string();

    let execution = poll_terminal(&app, &flow_id, &execution_id).await;
    assert_eq!(execution["status"], json!("success"));
    assert!(execution["finishedAt"].is_string());
    assert_eq!(
        execution["inputPayload"]["leadName"],
        json!("Acme"),
        "input captured verbatim"
    );

    let steps = execution["stepsLog"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    let order: Vec<&str> = steps
        .iter()
        .map(|s| s["nodeId"].as_str().unwrap())
        .collect();
    assert_eq!(order, vec!["t1", "x1", "v1", "m1"]);
    assert_eq!(steps[0]["nodeName"], json!("Inbound lead"));
    assert_eq!(steps[1]["output"]["derived"]["leadTier"], json!("hot"));
    assert_eq!(steps[2]["output"]["lead"]["email"], json!("sales@acme.io"));
    // The monitor saw every prior step.
    let snapshot = &steps[3]["output"]["dataSnapshot"]["stepResults"];
    for node in ["step_t1", "step_x1", "step_v1"] {
        assert!(snapshot.get(node).is_some(), "snapshot missing {node}");
    }
}

#[tokio::test]
async fn invalid_definition_is_400_with_exact_message_and_no_record() {
    let (app, core, _tmp) = test_app();
    let flow_id = create_flow(&app, "Broken", json!({"edges": []})).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        Some(json!({"inputPayload": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        json!("Invalid flow definition: nodes array is required")
    );

    let executions = core
        .storage
        .executions
        .list_executions_for_flow(ORG, &flow_id)
        .unwrap();
    assert!(executions.is_empty(), "no execution record may be created");
}

#[tokio::test]
async fn run_requires_payload_and_enabled_flow() {
    let (app, _core, _tmp) = test_app();
    let flow_id = create_flow(&app, "Gated", pure_definition()).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        Some(json!({"somethingElse": true})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Missing inputPayload"));

    // A request with no body at all gets the same 400, not an extractor
    // rejection.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Missing inputPayload"));

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/api/flows/{flow_id}"),
        Some(ORG),
        Some(json!({"enabled": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        Some(json!({"inputPayload": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Flow is disabled"));
}

#[tokio::test]
async fn missing_flow_and_missing_identity_are_rejected() {
    let (app, _core, _tmp) = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/flows/flow_ghost/run",
        Some(ORG),
        Some(json!({"inputPayload": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/flows", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_org_cannot_see_flows_or_executions() {
    let (app, _core, _tmp) = test_app();
    let flow_id = create_flow(&app, "Private", pure_definition()).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        Some(json!({"inputPayload": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let execution_id = body["executionId"].as_str().unwrap();

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/flows/{flow_id}/run?executionId={execution_id}"),
        Some("org_other"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/flows/{flow_id}"),
        Some("org_other"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dev_execute_resolves_alias_and_summarizes() {
    let (app, core, _tmp) = test_app();
    let flow_id = create_flow(&app, "Quote Follow Up", pure_definition()).await;

    let (status, body) = send(&app, "POST", "/api/flows/backfill-aliases", Some(ORG), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let alias = body["data"]["assigned"][0]["alias"].as_str().unwrap().to_string();
    assert_eq!(alias, "quote-follow-up");

    // Unauthenticated, resolved by alias, default input synthesized.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/flows/dev-execute/{alias}"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["flowId"], json!(flow_id));
    assert_eq!(body["summary"]["totalNodes"], json!(4));
    assert_eq!(body["summary"]["successfulNodes"], json!(4));
    assert_eq!(body["summary"]["failedNodes"], json!(0));
    assert_eq!(body["summary"]["apiCalls"], json!(0));
    assert!(body["results"]["t1"]["success"].as_bool().unwrap());

    // Dev execution leaves no durable record behind.
    let executions = core
        .storage
        .executions
        .list_executions_for_flow(ORG, &flow_id)
        .unwrap();
    assert!(executions.is_empty());
}

#[tokio::test]
async fn connection_lifecycle_never_exposes_credentials() {
    let (app, core, _tmp) = test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/connections",
        Some(ORG),
        Some(json!({
            "name": "CRM API",
            "connectionType": "api_key",
            "credentials": {"token": "sk-super-secret"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let connection_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(body["data"].get("credentials").is_none());

    // Stored ciphertext differs from the plaintext and decrypts with the
    // injected cipher only.
    let stored = core
        .storage
        .connections
        .get_connection(ORG, &connection_id)
        .unwrap()
        .unwrap();
    assert!(!stored.credentials.contains("sk-super-secret"));
    let plaintext = core.cipher.decrypt_string(&stored.credentials).unwrap();
    assert!(plaintext.contains("sk-super-secret"));

    let (status, body) = send(&app, "GET", "/api/connections", Some(ORG), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("credentials").is_none());

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/connections/{connection_id}"),
        Some(ORG),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/connections/{connection_id}"),
        Some(ORG),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_endpoint_handles_unknown_and_finished_runs() {
    let (app, _core, _tmp) = test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/api/executions/exec_ghost/cancel",
        Some(ORG),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let flow_id = create_flow(&app, "Quick", pure_definition()).await;
    let (_, body) = send(
        &app,
        "POST",
        &format!("/api/flows/{flow_id}/run"),
        Some(ORG),
        Some(json!({"inputPayload": {}})),
    )
    .await;
    let execution_id = body["executionId"].as_str().unwrap().to_string();
    poll_terminal(&app, &flow_id, &execution_id).await;

    // Cancelling a finished run is an idempotent no-op.
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/executions/{execution_id}/cancel"),
        Some(ORG),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancelled"], json!(false));
}

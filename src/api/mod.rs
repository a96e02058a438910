pub mod auth;
pub mod connections;
pub mod flows;
pub mod state;

pub use state::AppState;

use axum::{
    Json, Router,
    http::{Method, header},
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "leadflow is working!".to_string(),
    })
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static(auth::ORGANIZATION_HEADER),
        ]);

    Router::new()
        .route("/health", get(health))
        // Flow management
        .route("/api/flows", get(flows::list_flows).post(flows::create_flow))
        .route("/api/flows/backfill-aliases", post(flows::backfill_aliases))
        .route("/api/flows/dev-execute/{identifier}", post(flows::dev_execute))
        .route(
            "/api/flows/{id}",
            get(flows::get_flow)
                .put(flows::update_flow)
                .delete(flows::delete_flow),
        )
        // Execution trigger + polling
        .route("/api/flows/{id}/run", post(flows::run_flow).get(flows::get_run))
        .route("/api/executions/{id}/cancel", post(flows::cancel_execution))
        // Connection management
        .route(
            "/api/connections",
            get(connections::list_connections).post(connections::create_connection),
        )
        .route("/api/connections/{id}", delete(connections::delete_connection))
        .layer(cors)
        .with_state(state)
}

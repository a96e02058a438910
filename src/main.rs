use leadflow::config::EngineSettings;
use leadflow::{AppCore, api, paths};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leadflow=debug".into()),
        )
        .with_target(false)
        .init();

    info!("Starting LeadFlow engine");

    let settings = EngineSettings::from_env();
    let db_path = paths::ensure_database_path_string()?;
    let master_key = std::env::var("LEADFLOW_MASTER_KEY")
        .map_err(|_| anyhow::anyhow!("LEADFLOW_MASTER_KEY must be set"))?;

    let core = AppCore::new(&db_path, &master_key, settings)?;
    let app = api::router(core.app_state());

    let listener = tokio::net::TcpListener::bind(&core.settings.bind_addr).await?;
    info!("LeadFlow listening on http://{}", core.settings.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

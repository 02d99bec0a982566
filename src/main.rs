//! Main entry point for the Vertex Media Studio

use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vertex_media_studio::{
    api,
    backend::{
        credentials::{ServiceAccountKey, ServiceAccountTokenProvider},
        polling::RetryPolicy,
        vertex::VertexBackend,
    },
    config::{LoggingConfig, Settings},
    storage::{ArtifactStore, MetadataLedger},
    studio::Studio,
    AppState,
};

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format.eq_ignore_ascii_case("json") {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    init_logging(&settings.logging);
    settings.validate()?;

    info!("Starting Vertex Media Studio");

    // Refuse to start without a credential file
    let key = ServiceAccountKey::from_file(&settings.credentials.path)
        .with_context(|| format!("loading credentials from {}", settings.credentials.path))?;

    let project_id = settings
        .vertex
        .project_id
        .clone()
        .or_else(|| key.project_id.clone())
        .context("no project id configured and none found in the credential file")?;

    let tokens = Arc::new(ServiceAccountTokenProvider::new(key)?);
    info!(
        project = %project_id,
        location = %settings.vertex.location,
        account = %tokens.client_email(),
        "Loaded service account credentials"
    );

    let backend = VertexBackend::new(
        &settings.vertex,
        project_id,
        tokens,
        RetryPolicy::from(&settings.polling),
    )?;

    let studio = Studio::new(
        Arc::new(backend),
        ArtifactStore::new(
            settings.storage.output_dir(),
            settings.storage.public_path.clone(),
        ),
        MetadataLedger::new(settings.storage.metadata_path()),
    );
    studio.prepare().await?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    // Create application state
    let app_state = Arc::new(AppState {
        settings: Arc::new(settings),
        studio: Arc::new(studio),
    });

    // Build the router
    let app = api::routes::create_router(app_state);

    info!("Server listening on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

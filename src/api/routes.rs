//! Router construction

use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::handlers;
use crate::AppState;

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let public_path = state.settings.storage.public_path.trim_end_matches('/').to_string();
    let output_dir = state.studio.artifacts().storage_path().to_path_buf();
    let static_dir = state.settings.server.static_dir.clone();

    let api = Router::new()
        .route("/api/generate-image", post(handlers::generate_image))
        .route("/api/edit-image", post(handlers::edit_image))
        .route("/api/generate-video", post(handlers::generate_video))
        .route("/api/results", get(handlers::list_results))
        .route("/health", get(handlers::health))
        .with_state(state);

    // Edits rewrite artifacts in place
    let no_cache = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::EXPIRES,
            HeaderValue::from_static("0"),
        ));

    let outputs = Router::new()
        .nest_service(&public_path, ServeDir::new(output_dir))
        .layer(no_cache);

    let mut router = api.merge(outputs);

    if let Some(dir) = static_dir {
        if Path::new(&dir).is_dir() {
            router = router.fallback_service(ServeDir::new(dir));
        } else {
            warn!(path = %dir, "Static directory not found, front-end will not be served");
        }
    }

    router.layer(TraceLayer::new_for_http())
}

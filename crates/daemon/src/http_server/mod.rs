use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::ServiceState;

pub mod api;
pub mod health;

/// The full HTTP surface: file API, push channel, status probes, and the
/// static web directory for everything else.
pub fn router(state: ServiceState) -> Router {
    let mut router = Router::new()
        .merge(api::router(state.clone()))
        .nest("/_status", health::router(state.clone()));

    if let Some(web_dir) = &state.config().web_dir {
        tracing::info!("serving static files from {}", web_dir.display());
        router = router.fallback_service(ServeDir::new(web_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

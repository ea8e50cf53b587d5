use crate::error::ApiError;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Build the broker's router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/echo/health", get(handlers::health_check))
        .route("/echo/jobs", post(handlers::submit_job))
        .route("/echo/jobs/{job_id}", get(handlers::get_job))
        .route("/echo/index/{track_id}", get(handlers::get_index_pointer))
        .route(
            "/echo/{config_hash}/{source_hash}/{filename}",
            get(handlers::get_cas_object),
        );

    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    router
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn fallback_handler() -> ApiError {
    ApiError::NotFound("no such route".to_string())
}

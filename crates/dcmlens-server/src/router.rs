use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all dcmlens endpoints.
pub fn build_router(state: AppState, max_upload_size: usize) -> Router {
    Router::new()
        .route("/healthz", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/dicom/upload", post(handler::upload_handler))
        .route("/random_file", post(handler::random_file_handler))
        .layer(DefaultBodyLimit::max(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! HTTP surface
//!
//! Routes:
//! - `POST /remove-background` matting model, base64 JSON in and out
//! - `POST /remove-background-opencv` luma threshold, base64 JSON in and out
//! - `POST /restore` multipart upload, JPEG bytes out
//! - `GET /static/restored_images/<file>` previously restored files
//! - `GET /health` liveness and model availability

mod error;
mod handlers;
mod state;

pub use error::{error_chain, status_for, ApiError};
pub use state::{AppState, ModelHandle};

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Mount point of the results directory
pub const RESULTS_ROUTE: &str = "/static/restored_images";

/// Build the application router
///
/// `max_body_bytes` caps every request body, JSON and multipart alike.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    let results = ServeDir::new(state.results_dir.as_path())
        .not_found_service(handlers::restored_file_not_found.into_service());

    Router::new()
        .route("/remove-background", post(handlers::remove_background))
        .route(
            "/remove-background-opencv",
            post(handlers::remove_background_threshold),
        )
        .route("/restore", post(handlers::restore))
        .route("/health", get(handlers::health))
        .nest_service(RESULTS_ROUTE, results)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

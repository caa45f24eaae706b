use super::handlers;
use super::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/session", get(handlers::get_session))
        .route("/session/thought", get(handlers::get_thought))
        // Pending images
        .route("/session/images", post(handlers::add_images))
        .route("/session/images/:index", delete(handlers::remove_image))
        // Pipelines
        .route("/session/generate", post(handlers::generate))
        .route("/session/edit", post(handlers::edit))
        .route("/session/reset", post(handlers::reset))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

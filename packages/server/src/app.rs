//! Application setup and router configuration.

use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{health_handler, librus_handler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<synergia::Client>,
}

pub fn build_app(client: synergia::Client) -> Router {
    Router::new()
        .route("/librus", post(librus_handler))
        .route("/health", get(health_handler))
        .layer(Extension(AppState {
            client: Arc::new(client),
        }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

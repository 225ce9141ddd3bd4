//! Route modules for Slasherz Server

pub mod cards;
pub mod datapack;
pub mod health;
pub mod images;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/health", health::router())
        .nest("/api/datapack", datapack::router(&state))
        .nest("/api/cards", cards::router(&state))
        .nest("/images", images::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// Public API for integration tests and the server binary

pub mod api;
pub mod broadcast;
pub mod config;
pub mod directory;
pub mod error;
pub mod protocol;
pub mod roles;
pub mod room;
pub mod room_code;
pub mod state;
pub mod types;
pub mod words;
pub mod ws;

use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// All HTTP and WebSocket routes over `state`
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/api/rooms", get(api::list_rooms).post(api::create_room))
        .route("/api/rooms/{code}", get(api::get_room))
        .route("/api/rooms/{code}/settings", patch(api::update_settings))
        .route("/api/categories", get(api::list_categories));

    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/healthz", get(api::healthz))
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

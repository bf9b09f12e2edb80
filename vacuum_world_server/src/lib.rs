use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use vacuum_world_core::session::Session;

pub mod api;

/// The one session every request works on. The mutex keeps a single
/// request mutating the room and agent at a time.
pub type SharedSession = Arc<Mutex<Session>>;

pub fn shared(session: Session) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Builds the HTTP API around `session`.
pub fn router(session: SharedSession) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/state", get(api::get_state))
        .route("/api/reset", post(api::reset))
        .route("/api/move", post(api::manual_move))
        .route("/api/auto_clean", post(api::auto_clean))
        .route("/api/step_auto", post(api::step_auto))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

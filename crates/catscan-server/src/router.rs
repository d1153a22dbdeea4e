use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all catscan endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/add", post(handler::add_entry))
        .route("/count", get(handler::count))
        .route("/random", get(handler::random))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

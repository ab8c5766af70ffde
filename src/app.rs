use crate::handlers;
use crate::state::AppState;
use axum::{routing::{delete, get, patch}, Router};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/moods", get(handlers::list_moods))
        .route("/history", get(handlers::list_history).post(handlers::create_entry))
        .route(
            "/history/:id",
            patch(handlers::update_entry).delete(handlers::delete_entry),
        )
        .route("/account", delete(handlers::delete_account))
        .route("/account/statistics", get(handlers::get_statistics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

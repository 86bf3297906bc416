//! Route definitions for the `/cargas` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::cargas;
use crate::state::AppState;

/// Routes mounted at `/cargas`.
///
/// ```text
/// GET    /                                  -> list
/// GET    /{id}                              -> get_by_id
/// POST   /{id}/status                       -> change_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cargas::list))
        .route("/{id}", get(cargas::get_by_id))
        .route("/{id}/status", post(cargas::change_status))
}

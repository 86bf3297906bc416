//! Route definitions for the `/prefat` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::prefat;
use crate::state::AppState;

/// Routes mounted at `/prefat`.
///
/// ```text
/// GET    /                                  -> list
/// POST   /                                  -> create
/// GET    /{id}                              -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(prefat::list).post(prefat::create))
        .route("/{id}", get(prefat::get_by_id))
}

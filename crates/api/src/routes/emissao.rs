//! Route definitions for manifest ingestion.

use axum::routing::post;
use axum::Router;

use crate::handlers::emissao;
use crate::state::AppState;

/// Routes mounted at `/emissao`.
///
/// ```text
/// POST   /                                  -> ingest
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(emissao::ingest))
}

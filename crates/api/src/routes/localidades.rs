use axum::routing::get;
use axum::Router;

use crate::handlers::localidades;
use crate::state::AppState;

/// Routes mounted at `/localidades`.
///
/// ```text
/// GET    /estados                           -> list_estados
/// GET    /estados/{uf}/municipios           -> list_municipios
/// GET    /municipios/{codigo_ibge}          -> get_municipio
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/estados", get(localidades::list_estados))
        .route("/estados/{uf}/municipios", get(localidades::list_municipios))
        .route("/municipios/{codigo_ibge}", get(localidades::get_municipio))
}

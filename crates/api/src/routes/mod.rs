pub mod cargas;
pub mod emissao;
pub mod health;
pub mod localidades;
pub mod prefat;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /emissao                                   ingest a Notfis batch (POST)
///
/// /cargas                                    list shipments (GET)
/// /cargas/{id}                               shipment detail (GET)
/// /cargas/{id}/status                        change tracking status (POST)
///
/// /localidades/estados                       list states (GET)
/// /localidades/estados/{uf}/municipios       municipalities of a state (GET)
/// /localidades/municipios/{codigo_ibge}      one municipality (GET)
///
/// /prefat                                    list received files (GET)
/// /prefat                                    receive a PROCEDA 5.0 file by URL (POST)
/// /prefat/{id}                               one received file (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/emissao", emissao::router())
        .nest("/cargas", cargas::router())
        .nest("/localidades", localidades::router())
        .nest("/prefat", prefat::router())
}

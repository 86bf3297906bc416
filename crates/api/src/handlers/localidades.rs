//! Read-only geography lookups over the seeded `estados` / `municipios` tables.

use axum::extract::{Path, State};
use axum::Json;
use freightdoc_core::error::CoreError;
use freightdoc_core::geography::{normalize_uf, parse_ibge_code};
use freightdoc_db::models::locality::{Estado, MunicipioWithEstado};
use freightdoc_db::repositories::LocalityRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/localidades/estados
pub async fn list_estados(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<Estado>>>> {
    let data = LocalityRepo::list_estados(&state.pool).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/localidades/estados/{uf}/municipios
pub async fn list_municipios(
    State(state): State<AppState>,
    Path(uf): Path<String>,
) -> AppResult<Json<DataResponse<Vec<MunicipioWithEstado>>>> {
    let sigla = normalize_uf(&uf)
        .ok_or_else(|| AppError::BadRequest(format!("invalid state abbreviation: {uf}")))?;
    let estado = LocalityRepo::find_estado_by_sigla(&state.pool, &sigla)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("State {sigla} not found")))?;

    let data = LocalityRepo::list_municipios_by_estado(&state.pool, estado.id).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/localidades/municipios/{codigo_ibge}
pub async fn get_municipio(
    State(state): State<AppState>,
    Path(codigo): Path<String>,
) -> AppResult<Json<DataResponse<MunicipioWithEstado>>> {
    let codigo_ibge = parse_ibge_code(&codigo)
        .ok_or_else(|| AppError::BadRequest(format!("invalid IBGE code: {codigo}")))?;
    let data = LocalityRepo::find_municipio_by_codigo(&state.pool, codigo_ibge)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Municipality",
            id: codigo_ibge.into(),
        }))?;
    Ok(Json(DataResponse { data }))
}

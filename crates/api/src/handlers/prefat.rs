//! Handlers for `/prefat`: PROCEDA 5.0 pre-invoice files received by URL.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use freightdoc_core::error::CoreError;
use freightdoc_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use freightdoc_core::prefat::{PrefatRejection, PrefatReply, PrefatRequest, PROCEDA50_LAYOUT};
use freightdoc_core::types::DbId;
use freightdoc_db::models::prefat::{CreatePrefat, Prefat};
use freightdoc_db::repositories::PrefatRepo;

use crate::error::{AppError, AppResult};
use crate::fetch::{parse_source_url, FetchError};
use crate::query::PaginationParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

/// GET /api/v1/prefat
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<Prefat>>> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);

    let data = PrefatRepo::list(&state.pool, limit, offset).await?;
    let total = PrefatRepo::count(&state.pool).await?;

    Ok(Json(PageResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// GET /api/v1/prefat/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Prefat>>> {
    let data = PrefatRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Prefat",
            id,
        }))?;
    Ok(Json(DataResponse { data }))
}

/// Reasons a valid request still could not be received.
#[derive(Debug, thiserror::Error)]
enum ReceiveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ReceiveError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Fetch(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// POST /api/v1/prefat
///
/// Always answers with a [`PrefatReply`]. Bad layout or URL is 400, a failed
/// download is 502 and a failed insert is 500.
pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<PrefatRequest>,
) -> (StatusCode, Json<PrefatReply>) {
    let url = match request
        .source_url()
        .and_then(|raw| parse_source_url(raw).ok_or(PrefatRejection::Url))
    {
        Ok(url) => url,
        Err(rejection) => {
            tracing::warn!(layout = %request.layout, %rejection, "Prefat request rejected");
            return (StatusCode::BAD_REQUEST, Json(PrefatReply::rejected(rejection)));
        }
    };

    match receive(&state, &url).await {
        Ok(prefat) => {
            tracing::info!(
                prefat_id = prefat.id,
                size_bytes = prefat.size_bytes,
                url = %url,
                "Prefat file received",
            );
            (StatusCode::OK, Json(PrefatReply::received()))
        }
        Err(err) => {
            tracing::error!(url = %url, error = %err, "Prefat reception failed");
            (err.status(), Json(PrefatReply::reception_failed()))
        }
    }
}

async fn receive(state: &AppState, url: &reqwest::Url) -> Result<Prefat, ReceiveError> {
    let file = state.fetcher.fetch(url).await?;
    let input = CreatePrefat {
        layout: PROCEDA50_LAYOUT.to_string(),
        source_url: url.to_string(),
        prefat_base64: STANDARD.encode(&file),
        size_bytes: file.len() as i64,
    };
    Ok(PrefatRepo::create(&state.pool, &input).await?)
}

//! Handler for `POST /emissao`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use freightdoc_core::notfis::NotfisBatch;
use freightdoc_pipeline::store::PgShipmentStore;
use freightdoc_pipeline::{BatchResponse, IngestionService};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /api/v1/emissao
///
/// Every manifest is ingested in its own transaction on one connection held
/// for the whole request. Geography lookups share that connection. Per-manifest failures are reported in the body;
/// only failing to obtain the connection is an error response.
pub async fn ingest(
    State(state): State<AppState>,
    Json(batch): Json<NotfisBatch>,
) -> AppResult<(StatusCode, Json<BatchResponse>)> {
    if batch.documentos.is_empty() {
        tracing::warn!("Batch without manifests rejected");
        return Ok(respond(BatchResponse::empty()));
    }

    let store = PgShipmentStore::acquire(&state.pool).await?;
    let resolver = store.geography();

    let mut service = IngestionService::new(store, resolver)
        .with_policy(state.config.empty_shipment_policy)
        .with_cancellation(state.shutdown.child_token());

    let response = service.process_batch(&batch).await;
    tracing::info!(
        manifests = batch.documentos.len(),
        status = response.status,
        http_status = response.http_status(),
        "Batch ingested",
    );
    Ok(respond(response))
}

fn respond(response: BatchResponse) -> (StatusCode, Json<BatchResponse>) {
    let status = StatusCode::from_u16(response.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}


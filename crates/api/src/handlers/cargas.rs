//! Handlers for the `/cargas` resource: stored shipments and their tracking
//! status.

use axum::extract::{Path, Query, State};
use axum::Json;
use freightdoc_core::error::CoreError;
use freightdoc_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use freightdoc_core::tracking::{ShipmentStatus, StatusCodeInput};
use freightdoc_core::types::{DbId, Timestamp};
use freightdoc_db::models::invoice::ShipmentInvoice;
use freightdoc_db::models::shipment::{
    ActorColumns, LocationColumns, Shipment, ShipmentSummary, UpdateShipmentStatus,
};
use freightdoc_db::repositories::{InvoiceRepo, ShipmentRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::{DataResponse, PageResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// An actor with its resolved location, if any.
#[derive(Debug, Serialize)]
pub struct ActorView {
    #[serde(flatten)]
    pub fields: ActorColumns,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub localidade: Option<LocationColumns>,
}

/// Cargo block as received.
#[derive(Debug, Serialize)]
pub struct CargoView {
    pub pbru: Option<String>,
    pub pcub: Option<String>,
    pub qvol: Option<String>,
    pub vtot: Option<String>,
    pub c_orig_calc: Option<String>,
    pub c_dest_calc: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceView {
    pub id: DbId,
    pub invoice_number: Option<String>,
    pub access_key: Option<String>,
    pub cte_chave: Option<String>,
    pub remetente_ndoc: Option<String>,
}

impl From<ShipmentInvoice> for InvoiceView {
    fn from(invoice: ShipmentInvoice) -> Self {
        Self {
            id: invoice.id,
            invoice_number: invoice.invoice_number,
            access_key: invoice.access_key,
            cte_chave: invoice.cte_chave,
            remetente_ndoc: invoice.remetente_ndoc,
        }
    }
}

/// Full shipment as returned by `GET /cargas/{id}`.
///
/// Actors whose columns are all null are omitted, as are unresolved
/// locations.
#[derive(Debug, Serialize)]
pub struct CargaDetail {
    pub id: DbId,
    pub integration_date: Timestamp,
    pub service_code: String,
    pub c_tab: Option<String>,
    pub tp_emi: Option<i32>,
    pub emission_status: i32,
    pub c_aut: Option<String>,
    pub n_doc_emit: Option<String>,
    pub d_emi: Option<String>,
    pub toma: Option<String>,
    pub carga: CargoView,
    pub total_weight: Option<f64>,
    pub total_value: Option<f64>,
    pub volumes_qty: Option<i32>,
    pub status: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rem: Option<ActorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<ActorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tomador: Option<ActorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recebedor: Option<ActorView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origem: Option<LocationColumns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destino: Option<LocationColumns>,
    pub notas: Vec<InvoiceView>,
}

fn actor_view(fields: ActorColumns, location: LocationColumns) -> Option<ActorView> {
    if fields.is_empty() {
        return None;
    }
    Some(ActorView {
        fields,
        localidade: present(location),
    })
}

fn present(location: LocationColumns) -> Option<LocationColumns> {
    (!location.is_empty()).then_some(location)
}

impl CargaDetail {
    pub fn new(shipment: Shipment, invoices: Vec<ShipmentInvoice>) -> Self {
        let Shipment {
            id,
            integration_date,
            service_code,
            c_tab,
            tp_emi,
            emission_status,
            c_aut,
            n_doc_emit,
            d_emi,
            toma,
            pbru,
            pcub,
            qvol,
            vtot,
            c_orig_calc,
            c_dest_calc,
            rem,
            dest,
            tomador,
            recebedor,
            locations,
            total_weight,
            total_value,
            volumes_qty,
            status,
            ..
        } = shipment;

        Self {
            id,
            integration_date,
            service_code,
            c_tab,
            tp_emi,
            emission_status,
            c_aut,
            n_doc_emit,
            d_emi,
            toma,
            carga: CargoView {
                pbru,
                pcub,
                qvol,
                vtot,
                c_orig_calc,
                c_dest_calc,
            },
            total_weight,
            total_value,
            volumes_qty,
            status,
            rem: actor_view(rem, locations.rem),
            dest: actor_view(dest, locations.dest),
            // The payer has no location group of its own.
            tomador: actor_view(tomador, LocationColumns::default()),
            recebedor: actor_view(recebedor, locations.recebedor),
            origem: present(locations.origem),
            destino: present(locations.destino),
            notas: invoices.into_iter().map(InvoiceView::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Status change
// ---------------------------------------------------------------------------

/// Body of `POST /cargas/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    #[serde(default)]
    pub novo_status: Option<StatusCodeInput>,
    #[serde(default)]
    pub recebedor: Option<ActorColumns>,
}

#[derive(Debug, Serialize)]
pub struct StatusChanged {
    pub id: DbId,
    pub status: ShipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recebedor: Option<ActorColumns>,
}

/// Trim every text field, drop blanks, and discard the actor altogether when
/// nothing is left.
fn non_blank_receiver(actor: ActorColumns) -> Option<ActorColumns> {
    fn keep(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    let cleaned = ActorColumns {
        ndoc: keep(actor.ndoc),
        ie: keep(actor.ie),
        cfiscal: actor.cfiscal,
        xnome: keep(actor.xnome),
        xfant: keep(actor.xfant),
        xlgr: keep(actor.xlgr),
        nro: keep(actor.nro),
        xcpl: keep(actor.xcpl),
        xbairro: keep(actor.xbairro),
        cmun: keep(actor.cmun),
        cep: keep(actor.cep),
        cpais: actor.cpais,
        nfone: keep(actor.nfone),
        email: keep(actor.email),
    };
    (!cleaned.is_empty()).then_some(cleaned)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/cargas
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<PageResponse<ShipmentSummary>>> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);

    let data = ShipmentRepo::list(&state.pool, limit, offset).await?;
    let total = ShipmentRepo::count(&state.pool).await?;

    Ok(Json(PageResponse {
        data,
        total,
        limit,
        offset,
    }))
}

/// GET /api/v1/cargas/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CargaDetail>>> {
    let shipment = ShipmentRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Shipment",
            id,
        }))?;
    let invoices = InvoiceRepo::list_by_shipment(&state.pool, id).await?;

    Ok(Json(DataResponse {
        data: CargaDetail::new(shipment, invoices),
    }))
}

/// POST /api/v1/cargas/{id}/status
///
/// Validates the tracking code before touching the database. Carrier
/// notification is not performed here.
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ChangeStatusRequest>,
) -> AppResult<Json<DataResponse<StatusChanged>>> {
    let status = input.novo_status.unwrap_or_default().resolve()?;
    let recebedor = input.recebedor.and_then(non_blank_receiver);

    let update = UpdateShipmentStatus {
        status: serde_json::to_value(&status)
            .map_err(|e| AppError::InternalError(e.to_string()))?,
        recebedor: recebedor.clone(),
    };

    ShipmentRepo::update_status(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Shipment",
            id,
        }))?;

    tracing::info!(shipment_id = id, code = %status.code, "Shipment status changed");

    Ok(Json(DataResponse {
        data: StatusChanged {
            id,
            status,
            recebedor,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use freightdoc_db::models::shipment::ShipmentLocations;
    use serde_json::json;

    fn shipment() -> Shipment {
        Shipment {
            id: 7,
            external_ref: None,
            integration_date: Utc::now(),
            service_code: "1".into(),
            c_tab: None,
            tp_emi: Some(1),
            emission_status: 0,
            c_aut: None,
            n_doc_emit: None,
            d_emi: None,
            toma: Some("0".into()),
            pbru: Some("10.5".into()),
            pcub: None,
            qvol: None,
            vtot: None,
            c_orig_calc: None,
            c_dest_calc: None,
            rem: ActorColumns {
                ndoc: Some("11111111000111".into()),
                ..Default::default()
            },
            dest: ActorColumns::default(),
            tomador: ActorColumns::default(),
            recebedor: ActorColumns::default(),
            locations: ShipmentLocations {
                rem: LocationColumns {
                    uf: Some("SP".into()),
                    ..Default::default()
                },
                ..Default::default()
            },
            total_weight: Some(10.5),
            total_value: None,
            volumes_qty: None,
            status: None,
            raw_payload: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn detail_omits_empty_actors_and_locations() {
        let detail = serde_json::to_value(CargaDetail::new(shipment(), Vec::new())).unwrap();

        assert_eq!(detail["rem"]["nDoc"], "11111111000111");
        assert_eq!(detail["rem"]["localidade"]["uf"], "SP");
        assert!(detail.get("dest").is_none());
        assert!(detail.get("tomador").is_none());
        assert!(detail.get("origem").is_none());
        assert_eq!(detail["carga"]["pbru"], "10.5");
        assert_eq!(detail["notas"], json!([]));
    }

    #[test]
    fn blank_receiver_fields_are_dropped() {
        let actor = ActorColumns {
            xnome: Some("  Maria  ".into()),
            ndoc: Some("   ".into()),
            ..Default::default()
        };
        let cleaned = non_blank_receiver(actor).unwrap();
        assert_eq!(cleaned.xnome.as_deref(), Some("Maria"));
        assert_eq!(cleaned.ndoc, None);

        let blank = ActorColumns {
            email: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(non_blank_receiver(blank), None);
    }

    #[test]
    fn status_request_accepts_every_code_shape() {
        for body in [
            json!({ "novo_status": "1" }),
            json!({ "novo_status": 1 }),
            json!({ "novo_status": { "code": "1" } }),
            json!({ "novo_status": "{\"code\": 1}" }),
        ] {
            let request: ChangeStatusRequest = serde_json::from_value(body).unwrap();
            let status = request.novo_status.unwrap().resolve().unwrap();
            assert_eq!(status.code, "1");
        }
    }
}

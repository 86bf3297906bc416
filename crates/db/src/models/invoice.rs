//! Invoice (nota fiscal) rows attached to a shipment.

use freightdoc_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `shipment_invoices` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShipmentInvoice {
    pub id: DbId,
    pub shipment_id: DbId,
    pub n_ped: Option<String>,
    pub invoice_series: Option<String>,
    pub invoice_number: Option<String>,
    pub d_emi: Option<String>,
    pub v_bc: Option<String>,
    pub v_icms: Option<String>,
    pub v_bcst: Option<String>,
    pub v_st: Option<String>,
    pub v_prod: Option<String>,
    pub invoice_value: Option<f64>,
    pub ncfop: Option<String>,
    pub pbru: Option<String>,
    pub qvol: Option<String>,
    pub access_key: Option<String>,
    pub tp_doc: Option<String>,
    pub x_esp: Option<String>,
    pub x_nat: Option<String>,
    pub cte_chave: Option<String>,
    pub remetente_ndoc: Option<String>,
    pub xmls_b64: Option<Vec<String>>,
    pub created_at: Timestamp,
}

/// DTO for inserting an invoice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateShipmentInvoice {
    pub shipment_id: DbId,
    pub n_ped: Option<String>,
    pub invoice_series: Option<String>,
    pub invoice_number: Option<String>,
    pub d_emi: Option<String>,
    pub v_bc: Option<String>,
    pub v_icms: Option<String>,
    pub v_bcst: Option<String>,
    pub v_st: Option<String>,
    pub v_prod: Option<String>,
    pub invoice_value: Option<f64>,
    pub ncfop: Option<String>,
    pub pbru: Option<String>,
    pub qvol: Option<String>,
    pub access_key: Option<String>,
    pub tp_doc: Option<String>,
    pub x_esp: Option<String>,
    pub x_nat: Option<String>,
    pub cte_chave: Option<String>,
    pub remetente_ndoc: Option<String>,
    pub xmls_b64: Option<Vec<String>>,
}

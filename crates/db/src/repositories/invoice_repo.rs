//! Repository for the `shipment_invoices` table.

use freightdoc_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::invoice::{CreateShipmentInvoice, ShipmentInvoice};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, shipment_id, n_ped, invoice_series, invoice_number, d_emi, \
    v_bc, v_icms, v_bcst, v_st, v_prod, invoice_value, ncfop, pbru, qvol, access_key, \
    tp_doc, x_esp, x_nat, cte_chave, remetente_ndoc, xmls_b64, created_at";

/// Provides persistence for invoices attached to a shipment.
pub struct InvoiceRepo;

impl InvoiceRepo {
    /// Insert an invoice and return its id.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateShipmentInvoice,
    ) -> Result<DbId, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO shipment_invoices
                (shipment_id, n_ped, invoice_series, invoice_number, d_emi, v_bc, v_icms,
                 v_bcst, v_st, v_prod, invoice_value, ncfop, pbru, qvol, access_key, tp_doc,
                 x_esp, x_nat, cte_chave, remetente_ndoc, xmls_b64)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     $17, $18, $19, $20, $21)
             RETURNING id",
        )
        .bind(input.shipment_id)
        .bind(&input.n_ped)
        .bind(&input.invoice_series)
        .bind(&input.invoice_number)
        .bind(&input.d_emi)
        .bind(&input.v_bc)
        .bind(&input.v_icms)
        .bind(&input.v_bcst)
        .bind(&input.v_st)
        .bind(&input.v_prod)
        .bind(input.invoice_value)
        .bind(&input.ncfop)
        .bind(&input.pbru)
        .bind(&input.qvol)
        .bind(&input.access_key)
        .bind(&input.tp_doc)
        .bind(&input.x_esp)
        .bind(&input.x_nat)
        .bind(&input.cte_chave)
        .bind(&input.remetente_ndoc)
        .bind(&input.xmls_b64)
        .fetch_one(executor)
        .await
    }

    /// List the invoices of a shipment in insertion order.
    pub async fn list_by_shipment<'e, E>(
        executor: E,
        shipment_id: DbId,
    ) -> Result<Vec<ShipmentInvoice>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM shipment_invoices WHERE shipment_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, ShipmentInvoice>(&query)
            .bind(shipment_id)
            .fetch_all(executor)
            .await
    }
}

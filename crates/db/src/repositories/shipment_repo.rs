//! Repository for the `shipments` table.
//!
//! Every method takes a generic executor so the ingestion pipeline can run
//! them on the connection that holds its transaction.

use freightdoc_core::geography::LocationRole;
use freightdoc_core::types::DbId;
use sqlx::query_builder::Separated;
use sqlx::{PgExecutor, Postgres, QueryBuilder};

use crate::models::shipment::{
    ActorColumns, ActorSlot, CreateShipment, LocationColumns, Shipment, ShipmentSummary,
    UpdateShipmentStatus, ACTOR_FIELDS,
};

/// Header and cargo columns, in insert order.
const HEADER_COLUMNS: [&str; 14] = [
    "service_code",
    "c_tab",
    "tp_emi",
    "emission_status",
    "c_aut",
    "n_doc_emit",
    "d_emi",
    "toma",
    "pbru",
    "pcub",
    "qvol",
    "vtot",
    "c_orig_calc",
    "c_dest_calc",
];

/// Derived totals and audit columns, in insert order.
const TRAILING_COLUMNS: [&str; 4] = ["total_weight", "total_value", "volumes_qty", "raw_payload"];

/// Columns of the listing projection.
const SUMMARY_COLUMNS: &str = "s.id, s.service_code, s.n_doc_emit, s.d_emi, \
    s.rem_ndoc, s.rem_xnome, s.dest_ndoc, s.dest_xnome, \
    s.total_weight, s.total_value, s.volumes_qty, s.status, \
    (SELECT COUNT(*) FROM shipment_invoices i WHERE i.shipment_id = s.id) AS invoice_count, \
    s.integration_date";

fn insert_columns() -> String {
    let mut columns: Vec<String> = HEADER_COLUMNS.iter().map(|c| c.to_string()).collect();
    for slot in ActorSlot::ALL {
        let prefix = slot.column_prefix();
        columns.extend(ACTOR_FIELDS.iter().map(|f| format!("{prefix}_{f}")));
    }
    columns.extend(TRAILING_COLUMNS.iter().map(|c| c.to_string()));
    columns.join(", ")
}

/// Bind an actor group in [`ACTOR_FIELDS`] order.
fn push_actor<'args>(
    values: &mut Separated<'_, 'args, Postgres, &'static str>,
    actor: &'args ActorColumns,
) {
    values
        .push_bind(&actor.ndoc)
        .push_bind(&actor.ie)
        .push_bind(actor.cfiscal)
        .push_bind(&actor.xnome)
        .push_bind(&actor.xfant)
        .push_bind(&actor.xlgr)
        .push_bind(&actor.nro)
        .push_bind(&actor.xcpl)
        .push_bind(&actor.xbairro)
        .push_bind(&actor.cmun)
        .push_bind(&actor.cep)
        .push_bind(actor.cpais)
        .push_bind(&actor.nfone)
        .push_bind(&actor.email);
}

/// Provides persistence for shipments.
pub struct ShipmentRepo;

impl ShipmentRepo {
    /// Insert a shipment and return its id.
    pub async fn create<'e, E>(executor: E, input: &CreateShipment) -> Result<DbId, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO shipments (");
        qb.push(insert_columns());
        qb.push(") VALUES (");
        {
            let mut values = qb.separated(", ");
            values
                .push_bind(&input.service_code)
                .push_bind(&input.c_tab)
                .push_bind(input.tp_emi)
                .push_bind(input.emission_status)
                .push_bind(&input.c_aut)
                .push_bind(&input.n_doc_emit)
                .push_bind(&input.d_emi)
                .push_bind(&input.toma)
                .push_bind(&input.pbru)
                .push_bind(&input.pcub)
                .push_bind(&input.qvol)
                .push_bind(&input.vtot)
                .push_bind(&input.c_orig_calc)
                .push_bind(&input.c_dest_calc);
            for slot in ActorSlot::ALL {
                push_actor(&mut values, input.actor(slot));
            }
            values
                .push_bind(input.total_weight)
                .push_bind(input.total_value)
                .push_bind(input.volumes_qty)
                .push_bind(&input.raw_payload);
        }
        qb.push(") RETURNING id");
        qb.build_query_scalar::<DbId>().fetch_one(executor).await
    }

    /// Find a shipment by id.
    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Shipment>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List shipments, most recently integrated first.
    pub async fn list<'e, E>(
        executor: E,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ShipmentSummary>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {SUMMARY_COLUMNS} FROM shipments s
             ORDER BY s.integration_date DESC, s.id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, ShipmentSummary>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Total number of shipments.
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM shipments")
            .fetch_one(executor)
            .await
    }

    /// Write normalized location groups. Roles not listed are left untouched.
    ///
    /// Returns `true` if the shipment exists and was updated.
    pub async fn update_locations<'e, E>(
        executor: E,
        id: DbId,
        locations: &[(LocationRole, LocationColumns)],
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        if locations.is_empty() {
            return Ok(false);
        }

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE shipments SET ");
        {
            let mut set = qb.separated(", ");
            for (role, location) in locations {
                let prefix = role.column_prefix();
                set.push(format!("{prefix}_uf = "));
                set.push_bind_unseparated(&location.uf);
                set.push(format!("{prefix}_estado_codigo_ibge = "));
                set.push_bind_unseparated(location.estado_codigo_ibge);
                set.push(format!("{prefix}_municipio_codigo_ibge = "));
                set.push_bind_unseparated(location.municipio_codigo_ibge);
                set.push(format!("{prefix}_municipio_nome = "));
                set.push_bind_unseparated(&location.municipio_nome);
            }
            set.push("updated_at = NOW()");
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the status and merge the delivery-receiver fields.
    ///
    /// Receiver fields that are `None` keep their stored value. Returns
    /// `None` if no shipment has the given id.
    pub async fn update_status<'e, E>(
        executor: E,
        id: DbId,
        input: &UpdateShipmentStatus,
    ) -> Result<Option<Shipment>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let receiver = input.recebedor.clone().unwrap_or_default();
        let prefix = ActorSlot::DeliveryReceiver.column_prefix();
        // $1 is the id, $2 the status, receiver fields start at $3.
        let assignments = ACTOR_FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| {
                format!("{prefix}_{field} = COALESCE(${}, {prefix}_{field})", i + 3)
            })
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "UPDATE shipments SET status = $2, {assignments}, updated_at = NOW()
             WHERE id = $1
             RETURNING *"
        );
        sqlx::query_as::<_, Shipment>(&query)
            .bind(id)
            .bind(&input.status)
            .bind(&receiver.ndoc)
            .bind(&receiver.ie)
            .bind(receiver.cfiscal)
            .bind(&receiver.xnome)
            .bind(&receiver.xfant)
            .bind(&receiver.xlgr)
            .bind(&receiver.nro)
            .bind(&receiver.xcpl)
            .bind(&receiver.xbairro)
            .bind(&receiver.cmun)
            .bind(&receiver.cep)
            .bind(receiver.cpais)
            .bind(&receiver.nfone)
            .bind(&receiver.email)
            .fetch_optional(executor)
            .await
    }
}

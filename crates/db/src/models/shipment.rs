//! Shipment models. One shipment row per ingested manifest.
//!
//! Actor and location groups are stored flattened with a role prefix
//! (`rem_ndoc`, `dest_uf`, ...). The row types regroup them into nested
//! structs, so [`Shipment`] implements `FromRow` by hand.

use freightdoc_core::geography::{LocationRole, Municipality};
use freightdoc_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

/// Column suffixes of an actor group, in insert order.
pub const ACTOR_FIELDS: [&str; 14] = [
    "ndoc", "ie", "cfiscal", "xnome", "xfant", "xlgr", "nro", "xcpl", "xbairro", "cmun", "cep",
    "cpais", "nfone", "email",
];

/// Column prefix of each stored actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorSlot {
    Sender,
    Receiver,
    Payer,
    DeliveryReceiver,
}

impl ActorSlot {
    pub const ALL: [ActorSlot; 4] = [
        Self::Sender,
        Self::Receiver,
        Self::Payer,
        Self::DeliveryReceiver,
    ];

    pub fn column_prefix(self) -> &'static str {
        match self {
            Self::Sender => "rem",
            Self::Receiver => "dest",
            Self::Payer => "tomador",
            Self::DeliveryReceiver => "recebedor",
        }
    }
}

// ---------------------------------------------------------------------------
// Actor columns
// ---------------------------------------------------------------------------

/// One actor group. Serialized with the Notfis field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorColumns {
    #[serde(rename = "nDoc")]
    pub ndoc: Option<String>,
    #[serde(rename = "IE")]
    pub ie: Option<String>,
    #[serde(rename = "cFiscal")]
    pub cfiscal: Option<i32>,
    #[serde(rename = "xNome")]
    pub xnome: Option<String>,
    #[serde(rename = "xFant")]
    pub xfant: Option<String>,
    #[serde(rename = "xLgr")]
    pub xlgr: Option<String>,
    pub nro: Option<String>,
    #[serde(rename = "xCpl")]
    pub xcpl: Option<String>,
    #[serde(rename = "xBairro")]
    pub xbairro: Option<String>,
    #[serde(rename = "cMun")]
    pub cmun: Option<String>,
    #[serde(rename = "CEP")]
    pub cep: Option<String>,
    #[serde(rename = "cPais")]
    pub cpais: Option<i32>,
    #[serde(rename = "nFone")]
    pub nfone: Option<String>,
    pub email: Option<String>,
}

impl ActorColumns {
    /// True when every field is null.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn from_prefixed_row(row: &PgRow, prefix: &str) -> Result<Self, sqlx::Error> {
        let col = |field: &str| format!("{prefix}_{field}");
        Ok(Self {
            ndoc: row.try_get(col("ndoc").as_str())?,
            ie: row.try_get(col("ie").as_str())?,
            cfiscal: row.try_get(col("cfiscal").as_str())?,
            xnome: row.try_get(col("xnome").as_str())?,
            xfant: row.try_get(col("xfant").as_str())?,
            xlgr: row.try_get(col("xlgr").as_str())?,
            nro: row.try_get(col("nro").as_str())?,
            xcpl: row.try_get(col("xcpl").as_str())?,
            xbairro: row.try_get(col("xbairro").as_str())?,
            cmun: row.try_get(col("cmun").as_str())?,
            cep: row.try_get(col("cep").as_str())?,
            cpais: row.try_get(col("cpais").as_str())?,
            nfone: row.try_get(col("nfone").as_str())?,
            email: row.try_get(col("email").as_str())?,
        })
    }
}

// ---------------------------------------------------------------------------
// Location columns
// ---------------------------------------------------------------------------

/// One normalized location group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationColumns {
    pub uf: Option<String>,
    pub estado_codigo_ibge: Option<i32>,
    pub municipio_codigo_ibge: Option<i32>,
    pub municipio_nome: Option<String>,
}

impl LocationColumns {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn from_prefixed_row(row: &PgRow, prefix: &str) -> Result<Self, sqlx::Error> {
        let col = |field: &str| format!("{prefix}_{field}");
        Ok(Self {
            uf: row.try_get(col("uf").as_str())?,
            estado_codigo_ibge: row.try_get(col("estado_codigo_ibge").as_str())?,
            municipio_codigo_ibge: row.try_get(col("municipio_codigo_ibge").as_str())?,
            municipio_nome: row.try_get(col("municipio_nome").as_str())?,
        })
    }
}

impl From<&Municipality> for LocationColumns {
    fn from(m: &Municipality) -> Self {
        Self {
            uf: m.estado_sigla.clone(),
            estado_codigo_ibge: m.estado_codigo_ibge,
            municipio_codigo_ibge: Some(m.codigo_ibge),
            municipio_nome: Some(m.nome.clone()),
        }
    }
}

/// All normalized locations of a shipment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShipmentLocations {
    pub rem: LocationColumns,
    pub dest: LocationColumns,
    pub recebedor: LocationColumns,
    pub origem: LocationColumns,
    pub destino: LocationColumns,
}

impl ShipmentLocations {
    pub fn get(&self, role: LocationRole) -> &LocationColumns {
        match role {
            LocationRole::Sender => &self.rem,
            LocationRole::Receiver => &self.dest,
            LocationRole::DeliveryReceiver => &self.recebedor,
            LocationRole::Origin => &self.origem,
            LocationRole::Destination => &self.destino,
        }
    }

    pub fn set(&mut self, role: LocationRole, value: LocationColumns) {
        let slot = match role {
            LocationRole::Sender => &mut self.rem,
            LocationRole::Receiver => &mut self.dest,
            LocationRole::DeliveryReceiver => &mut self.recebedor,
            LocationRole::Origin => &mut self.origem,
            LocationRole::Destination => &mut self.destino,
        };
        *slot = value;
    }

    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let mut locations = Self::default();
        for role in LocationRole::ALL {
            locations.set(
                role,
                LocationColumns::from_prefixed_row(row, role.column_prefix())?,
            );
        }
        Ok(locations)
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A row from the `shipments` table.
#[derive(Debug, Clone, Serialize)]
pub struct Shipment {
    pub id: DbId,
    pub external_ref: Option<String>,
    pub integration_date: Timestamp,
    pub service_code: String,
    pub c_tab: Option<String>,
    pub tp_emi: Option<i32>,
    pub emission_status: i32,
    pub c_aut: Option<String>,
    pub n_doc_emit: Option<String>,
    pub d_emi: Option<String>,
    pub toma: Option<String>,
    pub pbru: Option<String>,
    pub pcub: Option<String>,
    pub qvol: Option<String>,
    pub vtot: Option<String>,
    pub c_orig_calc: Option<String>,
    pub c_dest_calc: Option<String>,
    pub rem: ActorColumns,
    pub dest: ActorColumns,
    pub tomador: ActorColumns,
    pub recebedor: ActorColumns,
    pub locations: ShipmentLocations,
    pub total_weight: Option<f64>,
    pub total_value: Option<f64>,
    pub volumes_qty: Option<i32>,
    pub status: Option<serde_json::Value>,
    pub raw_payload: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl<'r> FromRow<'r, PgRow> for Shipment {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            external_ref: row.try_get("external_ref")?,
            integration_date: row.try_get("integration_date")?,
            service_code: row.try_get("service_code")?,
            c_tab: row.try_get("c_tab")?,
            tp_emi: row.try_get("tp_emi")?,
            emission_status: row.try_get("emission_status")?,
            c_aut: row.try_get("c_aut")?,
            n_doc_emit: row.try_get("n_doc_emit")?,
            d_emi: row.try_get("d_emi")?,
            toma: row.try_get("toma")?,
            pbru: row.try_get("pbru")?,
            pcub: row.try_get("pcub")?,
            qvol: row.try_get("qvol")?,
            vtot: row.try_get("vtot")?,
            c_orig_calc: row.try_get("c_orig_calc")?,
            c_dest_calc: row.try_get("c_dest_calc")?,
            rem: ActorColumns::from_prefixed_row(row, ActorSlot::Sender.column_prefix())?,
            dest: ActorColumns::from_prefixed_row(row, ActorSlot::Receiver.column_prefix())?,
            tomador: ActorColumns::from_prefixed_row(row, ActorSlot::Payer.column_prefix())?,
            recebedor: ActorColumns::from_prefixed_row(
                row,
                ActorSlot::DeliveryReceiver.column_prefix(),
            )?,
            locations: ShipmentLocations::from_row(row)?,
            total_weight: row.try_get("total_weight")?,
            total_value: row.try_get("total_value")?,
            volumes_qty: row.try_get("volumes_qty")?,
            status: row.try_get("status")?,
            raw_payload: row.try_get("raw_payload")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Listing projection of a shipment.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShipmentSummary {
    pub id: DbId,
    pub service_code: String,
    pub n_doc_emit: Option<String>,
    pub d_emi: Option<String>,
    pub rem_ndoc: Option<String>,
    pub rem_xnome: Option<String>,
    pub dest_ndoc: Option<String>,
    pub dest_xnome: Option<String>,
    pub total_weight: Option<f64>,
    pub total_value: Option<f64>,
    pub volumes_qty: Option<i32>,
    pub status: Option<serde_json::Value>,
    pub invoice_count: i64,
    pub integration_date: Timestamp,
}

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// DTO for inserting a shipment. Produced by the manifest mapper.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateShipment {
    pub service_code: String,
    pub c_tab: Option<String>,
    pub tp_emi: Option<i32>,
    pub emission_status: i32,
    pub c_aut: Option<String>,
    pub n_doc_emit: Option<String>,
    pub d_emi: Option<String>,
    pub toma: Option<String>,
    pub pbru: Option<String>,
    pub pcub: Option<String>,
    pub qvol: Option<String>,
    pub vtot: Option<String>,
    pub c_orig_calc: Option<String>,
    pub c_dest_calc: Option<String>,
    pub rem: ActorColumns,
    pub dest: ActorColumns,
    pub tomador: ActorColumns,
    pub recebedor: ActorColumns,
    pub total_weight: Option<f64>,
    pub total_value: Option<f64>,
    pub volumes_qty: Option<i32>,
    pub raw_payload: Option<String>,
}

impl CreateShipment {
    pub fn actor(&self, slot: ActorSlot) -> &ActorColumns {
        match slot {
            ActorSlot::Sender => &self.rem,
            ActorSlot::Receiver => &self.dest,
            ActorSlot::Payer => &self.tomador,
            ActorSlot::DeliveryReceiver => &self.recebedor,
        }
    }
}

/// DTO for a status change. `recebedor` fields that are `None` keep their
/// stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateShipmentStatus {
    pub status: serde_json::Value,
    pub recebedor: Option<ActorColumns>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_columns_use_notfis_names() {
        let actor = ActorColumns {
            ndoc: Some("11111111000111".into()),
            cep: Some("01001000".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&actor).unwrap();
        assert_eq!(json["nDoc"], "11111111000111");
        assert_eq!(json["CEP"], "01001000");
        assert!(!actor.is_empty());
        assert!(ActorColumns::default().is_empty());
    }

    #[test]
    fn location_from_municipality() {
        let m = Municipality {
            codigo_ibge: 3550308,
            nome: "São Paulo".into(),
            estado_codigo_ibge: Some(35),
            estado_sigla: Some("SP".into()),
        };
        let loc = LocationColumns::from(&m);
        assert_eq!(loc.uf.as_deref(), Some("SP"));
        assert_eq!(loc.municipio_codigo_ibge, Some(3550308));

        let mut all = ShipmentLocations::default();
        all.set(LocationRole::Origin, loc.clone());
        assert_eq!(all.get(LocationRole::Origin), &loc);
        assert!(all.get(LocationRole::Destination).is_empty());
    }
}

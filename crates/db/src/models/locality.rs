//! State and municipality reference rows.

use freightdoc_core::geography::Municipality;
use freightdoc_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `estados` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Estado {
    pub id: DbId,
    pub codigo_ibge: i32,
    pub sigla: String,
    pub nome: String,
}

/// A municipality joined with its state.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MunicipioWithEstado {
    pub id: DbId,
    pub codigo_ibge: i32,
    pub nome: String,
    pub estado_id: DbId,
    pub estado_codigo_ibge: Option<i32>,
    pub estado_sigla: Option<String>,
}

impl From<MunicipioWithEstado> for Municipality {
    fn from(row: MunicipioWithEstado) -> Self {
        Self {
            codigo_ibge: row.codigo_ibge,
            nome: row.nome,
            estado_codigo_ibge: row.estado_codigo_ibge,
            estado_sigla: row.estado_sigla,
        }
    }
}

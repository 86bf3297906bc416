//! Read access to the `estados` and `municipios` reference tables.

use freightdoc_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::locality::{Estado, MunicipioWithEstado};

const ESTADO_COLUMNS: &str = "id, codigo_ibge, sigla, nome";

const MUNICIPIO_COLUMNS: &str = "m.id, m.codigo_ibge, m.nome, m.estado_id, \
    e.codigo_ibge AS estado_codigo_ibge, e.sigla AS estado_sigla";

pub struct LocalityRepo;

impl LocalityRepo {
    /// All states ordered by abbreviation.
    pub async fn list_estados<'e, E>(executor: E) -> Result<Vec<Estado>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {ESTADO_COLUMNS} FROM estados ORDER BY sigla");
        sqlx::query_as::<_, Estado>(&query).fetch_all(executor).await
    }

    /// Find a state by its two-letter abbreviation (already upper-cased).
    pub async fn find_estado_by_sigla<'e, E>(
        executor: E,
        sigla: &str,
    ) -> Result<Option<Estado>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {ESTADO_COLUMNS} FROM estados WHERE sigla = $1");
        sqlx::query_as::<_, Estado>(&query)
            .bind(sigla)
            .fetch_optional(executor)
            .await
    }

    /// Municipalities of one state ordered by name.
    pub async fn list_municipios_by_estado<'e, E>(
        executor: E,
        estado_id: DbId,
    ) -> Result<Vec<MunicipioWithEstado>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {MUNICIPIO_COLUMNS}
             FROM municipios m LEFT JOIN estados e ON e.id = m.estado_id
             WHERE m.estado_id = $1
             ORDER BY m.nome"
        );
        sqlx::query_as::<_, MunicipioWithEstado>(&query)
            .bind(estado_id)
            .fetch_all(executor)
            .await
    }

    /// Find a municipality by IBGE code, with its state.
    pub async fn find_municipio_by_codigo<'e, E>(
        executor: E,
        codigo_ibge: i32,
    ) -> Result<Option<MunicipioWithEstado>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {MUNICIPIO_COLUMNS}
             FROM municipios m LEFT JOIN estados e ON e.id = m.estado_id
             WHERE m.codigo_ibge = $1"
        );
        sqlx::query_as::<_, MunicipioWithEstado>(&query)
            .bind(codigo_ibge)
            .fetch_optional(executor)
            .await
    }
}

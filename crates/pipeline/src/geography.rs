//! Geography lookups used to enrich shipments with normalized locations.

use async_trait::async_trait;
use freightdoc_core::geography::{parse_ibge_code, LocationRole, Municipality};
use freightdoc_core::notfis::Manifest;
use freightdoc_db::repositories::LocalityRepo;

use crate::store::SharedConnection;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("geography source unavailable: {0}")]
    Unavailable(String),
}

/// Resolves an administrative (IBGE) code to a municipality.
///
/// An unknown code is `Ok(None)`, never an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeographyResolver: Send + Sync {
    async fn resolve(&self, code: &str) -> Result<Option<Municipality>, ResolveError>;
}

/// Resolver backed by the `municipios` / `estados` tables.
///
/// Built with [`PgShipmentStore::geography`](crate::store::PgShipmentStore::geography):
/// lookups run on the store's connection, so they see the open transaction
/// and never wait on the pool.
#[derive(Clone)]
pub struct PgGeographyResolver {
    conn: SharedConnection,
}

impl PgGeographyResolver {
    pub(crate) fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl GeographyResolver for PgGeographyResolver {
    async fn resolve(&self, code: &str) -> Result<Option<Municipality>, ResolveError> {
        let Some(codigo_ibge) = parse_ibge_code(code) else {
            return Ok(None);
        };
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_deref_mut()
            .ok_or_else(|| ResolveError::Unavailable("store connection was closed".into()))?;
        let row = LocalityRepo::find_municipio_by_codigo(conn, codigo_ibge).await?;
        Ok(row.map(Municipality::from))
    }
}

/// Codes to resolve for a manifest, one per location role that carries one.
pub fn location_sources(manifest: &Manifest) -> Vec<(LocationRole, String)> {
    let candidates = [
        (LocationRole::Sender, manifest.rem.c_mun.as_deref()),
        (LocationRole::Receiver, manifest.dest.c_mun.as_deref()),
        (
            LocationRole::DeliveryReceiver,
            manifest.receb.as_ref().and_then(|r| r.c_mun.as_deref()),
        ),
        (LocationRole::Origin, manifest.minuta.origin_code()),
        (LocationRole::Destination, manifest.minuta.destination_code()),
    ];
    candidates
        .into_iter()
        .filter_map(|(role, code)| {
            let code = code?.trim();
            (!code.is_empty()).then(|| (role, code.to_string()))
        })
        .collect()
}

//! Transactional persistence used by the ingestion pipeline.
//!
//! A store owns one connection for the lifetime of a batch. The orchestrator
//! opens one transaction per manifest and nests savepoints inside it.

use std::sync::Arc;

use async_trait::async_trait;
use freightdoc_core::geography::LocationRole;
use freightdoc_core::types::DbId;
use freightdoc_db::models::invoice::CreateShipmentInvoice;
use freightdoc_db::models::shipment::{CreateShipment, LocationColumns};
use freightdoc_db::repositories::{InvoiceRepo, ShipmentRepo};
use freightdoc_db::DbPool;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Postgres};
use tokio::sync::Mutex;

use crate::geography::PgGeographyResolver;

/// The held connection, shared with the geography resolver built from the
/// same store. `None` once the connection has been detached.
pub(crate) type SharedConnection = Arc<Mutex<Option<PoolConnection<Postgres>>>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// The store refused the write without reaching a database.
    #[error("{0}")]
    Rejected(String),

    #[error("no transaction is open")]
    NoTransaction,

    #[error("a transaction is already open")]
    TransactionOpen,

    #[error("unknown savepoint {0}")]
    UnknownSavepoint(String),

    #[error("connection is no longer available")]
    ConnectionLost,
}

/// Handle to an open savepoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint(u32);

impl Savepoint {
    pub fn new(seq: u32) -> Self {
        Self(seq)
    }

    /// SQL identifier for this savepoint.
    pub fn name(self) -> String {
        format!("sp_{}", self.0)
    }
}

/// Persistence contract of the ingestion pipeline.
#[async_trait]
pub trait ShipmentStore: Send {
    async fn begin(&mut self) -> Result<(), StoreError>;
    async fn savepoint(&mut self) -> Result<Savepoint, StoreError>;
    async fn release_savepoint(&mut self, savepoint: Savepoint) -> Result<(), StoreError>;
    async fn rollback_to_savepoint(&mut self, savepoint: Savepoint) -> Result<(), StoreError>;
    async fn commit(&mut self) -> Result<(), StoreError>;
    async fn rollback(&mut self) -> Result<(), StoreError>;

    async fn insert_shipment(&mut self, shipment: &CreateShipment) -> Result<DbId, StoreError>;
    async fn insert_invoice(&mut self, invoice: &CreateShipmentInvoice)
        -> Result<DbId, StoreError>;
    async fn update_locations(
        &mut self,
        shipment_id: DbId,
        locations: &[(LocationRole, LocationColumns)],
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// [`ShipmentStore`] over a single pooled PostgreSQL connection.
///
/// Transactions and savepoints are issued as plain SQL on the held
/// connection. Geography lookups made through [`PgShipmentStore::geography`]
/// run on that same connection, inside whatever transaction and savepoint
/// are open, so a batch never needs a second pool connection. If the store
/// is dropped with a transaction still open, the connection is detached from
/// the pool so it closes instead of being reused.
pub struct PgShipmentStore {
    conn: SharedConnection,
    in_transaction: bool,
    next_savepoint: u32,
    open_savepoints: Vec<Savepoint>,
}

impl PgShipmentStore {
    /// Borrow a connection from the pool for the whole batch.
    pub async fn acquire(pool: &DbPool) -> Result<Self, StoreError> {
        let conn = pool.acquire().await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            in_transaction: false,
            next_savepoint: 0,
            open_savepoints: Vec::new(),
        })
    }

    /// Resolver whose lookups share this store's connection.
    pub fn geography(&self) -> PgGeographyResolver {
        PgGeographyResolver::new(Arc::clone(&self.conn))
    }

    /// Run a statement through the simple query protocol, unprepared.
    async fn run(&mut self, sql: &str) -> Result<(), StoreError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_deref_mut().ok_or(StoreError::ConnectionLost)?;
        conn.execute(sql).await?;
        Ok(())
    }

    fn ensure_transaction(&self) -> Result<(), StoreError> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StoreError::NoTransaction)
        }
    }

    /// Position of a savepoint in the open stack.
    fn savepoint_position(&self, savepoint: Savepoint) -> Result<usize, StoreError> {
        self.open_savepoints
            .iter()
            .position(|sp| *sp == savepoint)
            .ok_or_else(|| StoreError::UnknownSavepoint(savepoint.name()))
    }

    fn reset_transaction_state(&mut self) {
        self.in_transaction = false;
        self.open_savepoints.clear();
    }
}

#[async_trait]
impl ShipmentStore for PgShipmentStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            return Err(StoreError::TransactionOpen);
        }
        self.run("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<Savepoint, StoreError> {
        self.ensure_transaction()?;
        self.next_savepoint += 1;
        let savepoint = Savepoint::new(self.next_savepoint);
        self.run(&format!("SAVEPOINT {}", savepoint.name())).await?;
        self.open_savepoints.push(savepoint);
        Ok(savepoint)
    }

    async fn release_savepoint(&mut self, savepoint: Savepoint) -> Result<(), StoreError> {
        self.ensure_transaction()?;
        let position = self.savepoint_position(savepoint)?;
        self.run(&format!("RELEASE SAVEPOINT {}", savepoint.name()))
            .await?;
        // Releasing also releases every savepoint opened after it.
        self.open_savepoints.truncate(position);
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, savepoint: Savepoint) -> Result<(), StoreError> {
        self.ensure_transaction()?;
        let position = self.savepoint_position(savepoint)?;
        self.run(&format!("ROLLBACK TO SAVEPOINT {}", savepoint.name()))
            .await?;
        // The rolled-back savepoint itself stays valid in PostgreSQL, but the
        // pipeline never reuses it.
        self.open_savepoints.truncate(position);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_transaction()?;
        self.run("COMMIT").await?;
        self.reset_transaction_state();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Ok(());
        }
        let result = self.run("ROLLBACK").await;
        self.reset_transaction_state();
        result
    }

    async fn insert_shipment(&mut self, shipment: &CreateShipment) -> Result<DbId, StoreError> {
        self.ensure_transaction()?;
        let mut guard = self.conn.lock().await;
        let conn = guard.as_deref_mut().ok_or(StoreError::ConnectionLost)?;
        Ok(ShipmentRepo::create(conn, shipment).await?)
    }

    async fn insert_invoice(
        &mut self,
        invoice: &CreateShipmentInvoice,
    ) -> Result<DbId, StoreError> {
        self.ensure_transaction()?;
        let mut guard = self.conn.lock().await;
        let conn = guard.as_deref_mut().ok_or(StoreError::ConnectionLost)?;
        Ok(InvoiceRepo::create(conn, invoice).await?)
    }

    async fn update_locations(
        &mut self,
        shipment_id: DbId,
        locations: &[(LocationRole, LocationColumns)],
    ) -> Result<(), StoreError> {
        self.ensure_transaction()?;
        let mut guard = self.conn.lock().await;
        let conn = guard.as_deref_mut().ok_or(StoreError::ConnectionLost)?;
        ShipmentRepo::update_locations(conn, shipment_id, locations).await?;
        Ok(())
    }
}

impl Drop for PgShipmentStore {
    fn drop(&mut self) {
        if !self.in_transaction {
            return;
        }
        // A resolver may still share the connection; taking it out of the
        // slot detaches it for both.
        if let Some(conn) = self.conn.try_lock().ok().and_then(|mut slot| slot.take()) {
            tracing::warn!("Store dropped inside a transaction, closing its connection");
            drop(conn.detach());
        }
    }
}

//! In-memory [`ShipmentStore`] with real transaction and savepoint semantics.
//!
//! Every savepoint snapshots the working state; rolling back restores the
//! snapshot and committing publishes the working state. Ids come from
//! sequences that are never rolled back, as in PostgreSQL. Faults can be
//! injected to exercise the failure paths of the pipeline.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use freightdoc_core::geography::LocationRole;
use freightdoc_core::notfis::ACCESS_KEY_LENGTH;
use freightdoc_core::types::DbId;
use freightdoc_db::models::invoice::CreateShipmentInvoice;
use freightdoc_db::models::shipment::{CreateShipment, LocationColumns, ShipmentLocations};

use crate::store::{Savepoint, ShipmentStore, StoreError};

/// A shipment as held by the memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredShipment {
    pub shipment: CreateShipment,
    pub locations: ShipmentLocations,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    shipments: BTreeMap<DbId, StoredShipment>,
    invoices: BTreeMap<DbId, CreateShipmentInvoice>,
}

#[derive(Debug, Clone, Default)]
struct Faults {
    shipment_insert: bool,
    commit: bool,
    location_update: bool,
    rejected_invoice_numbers: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Snapshot,
    working: Option<Snapshot>,
    savepoints: Vec<(Savepoint, Snapshot)>,
    next_shipment_id: DbId,
    next_invoice_id: DbId,
    next_savepoint: u32,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every shipment insert fails.
    pub fn failing_shipment_insert(mut self) -> Self {
        self.faults.shipment_insert = true;
        self
    }

    /// Every commit fails. The transaction is discarded.
    pub fn failing_commit(mut self) -> Self {
        self.faults.commit = true;
        self
    }

    /// Every location update fails.
    pub fn failing_location_update(mut self) -> Self {
        self.faults.location_update = true;
        self
    }

    /// Reject invoices with the given invoice number.
    pub fn rejecting_invoice(mut self, invoice_number: &str) -> Self {
        self.faults
            .rejected_invoice_numbers
            .insert(invoice_number.to_string());
        self
    }

    // -- inspection -------------------------------------------------------

    pub fn in_transaction(&self) -> bool {
        self.working.is_some()
    }

    /// Committed shipments in id order.
    pub fn shipments(&self) -> Vec<(DbId, &StoredShipment)> {
        self.committed
            .shipments
            .iter()
            .map(|(id, s)| (*id, s))
            .collect()
    }

    pub fn shipment(&self, id: DbId) -> Option<&StoredShipment> {
        self.committed.shipments.get(&id)
    }

    /// Committed invoices of one shipment in id order.
    pub fn invoices_of(&self, shipment_id: DbId) -> Vec<&CreateShipmentInvoice> {
        self.committed
            .invoices
            .values()
            .filter(|inv| inv.shipment_id == shipment_id)
            .collect()
    }

    pub fn invoice_count(&self) -> usize {
        self.committed.invoices.len()
    }

    // -- internals --------------------------------------------------------

    fn working(&mut self) -> Result<&mut Snapshot, StoreError> {
        self.working.as_mut().ok_or(StoreError::NoTransaction)
    }

    fn savepoint_position(&self, savepoint: Savepoint) -> Result<usize, StoreError> {
        self.savepoints
            .iter()
            .position(|(sp, _)| *sp == savepoint)
            .ok_or_else(|| StoreError::UnknownSavepoint(savepoint.name()))
    }
}

#[async_trait]
impl ShipmentStore for MemoryStore {
    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.working.is_some() {
            return Err(StoreError::TransactionOpen);
        }
        self.working = Some(self.committed.clone());
        Ok(())
    }

    async fn savepoint(&mut self) -> Result<Savepoint, StoreError> {
        let snapshot = self.working()?.clone();
        self.next_savepoint += 1;
        let savepoint = Savepoint::new(self.next_savepoint);
        self.savepoints.push((savepoint, snapshot));
        Ok(savepoint)
    }

    async fn release_savepoint(&mut self, savepoint: Savepoint) -> Result<(), StoreError> {
        self.working()?;
        let position = self.savepoint_position(savepoint)?;
        self.savepoints.truncate(position);
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, savepoint: Savepoint) -> Result<(), StoreError> {
        self.working()?;
        let position = self.savepoint_position(savepoint)?;
        let (_, snapshot) = self
            .savepoints
            .drain(position..)
            .next()
            .ok_or_else(|| StoreError::UnknownSavepoint(savepoint.name()))?;
        self.working = Some(snapshot);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let working = self.working.take().ok_or(StoreError::NoTransaction)?;
        self.savepoints.clear();
        if self.faults.commit {
            return Err(StoreError::Rejected("commit failed".into()));
        }
        self.committed = working;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.working = None;
        self.savepoints.clear();
        Ok(())
    }

    async fn insert_shipment(&mut self, shipment: &CreateShipment) -> Result<DbId, StoreError> {
        if self.faults.shipment_insert {
            self.working()?;
            return Err(StoreError::Rejected("shipment insert failed".into()));
        }
        self.next_shipment_id += 1;
        let id = self.next_shipment_id;
        self.working()?.shipments.insert(
            id,
            StoredShipment {
                shipment: shipment.clone(),
                locations: ShipmentLocations::default(),
            },
        );
        Ok(id)
    }

    async fn insert_invoice(
        &mut self,
        invoice: &CreateShipmentInvoice,
    ) -> Result<DbId, StoreError> {
        if let Some(key) = &invoice.access_key {
            if key.chars().count() != ACCESS_KEY_LENGTH {
                return Err(StoreError::Rejected(
                    "access key violates ck_shipment_invoices_access_key_length".into(),
                ));
            }
        }
        if let Some(number) = &invoice.invoice_number {
            if self.faults.rejected_invoice_numbers.contains(number) {
                return Err(StoreError::Rejected(format!("invoice {number} rejected")));
            }
        }
        if !self.working()?.shipments.contains_key(&invoice.shipment_id) {
            return Err(StoreError::Rejected(format!(
                "shipment {} does not exist",
                invoice.shipment_id
            )));
        }
        self.next_invoice_id += 1;
        let id = self.next_invoice_id;
        self.working()?.invoices.insert(id, invoice.clone());
        Ok(id)
    }

    async fn update_locations(
        &mut self,
        shipment_id: DbId,
        locations: &[(LocationRole, LocationColumns)],
    ) -> Result<(), StoreError> {
        let fail = self.faults.location_update;
        let working = self.working()?;
        let stored = working
            .shipments
            .get_mut(&shipment_id)
            .ok_or_else(|| StoreError::Rejected(format!("shipment {shipment_id} does not exist")))?;
        for (role, location) in locations {
            stored.locations.set(*role, location.clone());
        }
        // Applied before failing so a missing rollback would be visible.
        if fail {
            return Err(StoreError::Rejected("location update failed".into()));
        }
        Ok(())
    }
}

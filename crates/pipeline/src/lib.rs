//! Per-manifest transactional ingestion of Notfis batches.
//!
//! The [`orchestrator::IngestionService`] walks a batch one manifest at a
//! time. Each manifest runs in its own transaction on a [`store::ShipmentStore`],
//! geography enrichment and every invoice get their own savepoint, and the
//! per-manifest outcomes are folded into one [`aggregator::BatchResponse`].

pub mod aggregator;
pub mod error;
pub mod geography;
pub mod mapper;
pub mod memory;
pub mod orchestrator;
pub mod store;

pub use aggregator::{BatchOutcome, BatchResponse, ManifestResult};
pub use error::IngestError;
pub use orchestrator::{EmptyShipmentPolicy, IngestionService};

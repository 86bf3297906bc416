pub mod invoice_repo;
pub mod locality_repo;
pub mod prefat_repo;
pub mod shipment_repo;

pub use invoice_repo::InvoiceRepo;
pub use locality_repo::LocalityRepo;
pub use prefat_repo::PrefatRepo;
pub use shipment_repo::ShipmentRepo;

pub mod invoice;
pub mod locality;
pub mod prefat;
pub mod shipment;

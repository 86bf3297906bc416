//! Domain types shared by the freight-document backend.
//!
//! Nothing in this crate performs I/O: it holds the Notfis payload model and
//! its validation rules, the PROCEDA prefat request, the geography vocabulary used for address
//! normalization, the tracking-code table, and the common error type.

pub mod error;
pub mod geography;
pub mod notfis;
pub mod pagination;
pub mod prefat;
pub mod tracking;
pub mod types;

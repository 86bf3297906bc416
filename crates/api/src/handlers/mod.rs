//! Request handlers.
//!
//! Read endpoints delegate to the repositories in `freightdoc_db` and map
//! errors via [`crate::error::AppError`]. Ingestion delegates to
//! `freightdoc_pipeline`. Prefat reception downloads through [`crate::fetch`].

pub mod cargas;
pub mod emissao;
pub mod localidades;
pub mod prefat;

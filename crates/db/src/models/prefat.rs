//! Received PROCEDA prefat files.

use freightdoc_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `prefats` table.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Prefat {
    pub id: DbId,
    pub layout: String,
    pub source_url: String,
    pub prefat_base64: String,
    pub size_bytes: i64,
    pub created_at: Timestamp,
}

/// DTO for storing a fetched file.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePrefat {
    pub layout: String,
    pub source_url: String,
    pub prefat_base64: String,
    /// Size of the decoded file.
    pub size_bytes: i64,
}

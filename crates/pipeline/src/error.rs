use freightdoc_core::notfis::ManifestError;

use crate::store::StoreError;

/// Why a manifest or one of its invoices could not be ingested.
///
/// The `Display` output is what ends up in the per-manifest result message.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Bad or missing mandatory data on a manifest or invoice.
    #[error("validation error: {0}")]
    Validation(String),

    /// The store refused a write.
    #[error("save error: {0}")]
    Persistence(String),

    /// Geography lookup failed. Swallowed at the enrichment savepoint.
    #[error("enrichment failed: {0}")]
    Enrichment(String),

    /// Anything else, reported with a short kind name.
    #[error("error: {kind}: {message}")]
    Unclassified { kind: &'static str, message: String },
}

impl IngestError {
    pub fn unclassified(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Unclassified {
            kind,
            message: message.into(),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Persistence(_) => "persistence",
            Self::Enrichment(_) => "enrichment",
            Self::Unclassified { kind, .. } => kind,
        }
    }
}

impl From<ManifestError> for IngestError {
    fn from(err: ManifestError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => Self::Persistence(e.to_string()),
            StoreError::Rejected(msg) => Self::Persistence(msg),
            other => Self::unclassified("StoreError", other.to_string()),
        }
    }
}

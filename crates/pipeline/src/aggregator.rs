//! Per-manifest results and the batch response built from them.

use freightdoc_core::types::DbId;
use serde::Serialize;

use crate::error::IngestError;

pub const STATUS_OK: u8 = 1;
pub const STATUS_FAILED: u8 = 0;

pub const BATCH_SUCCESS_MESSAGE: &str = "documents registered";
pub const BATCH_FAILURE_MESSAGE: &str = "errors occurred while processing";
pub const EMPTY_BATCH_MESSAGE: &str = "failed to process request";
pub const NO_MANIFESTS_MESSAGE: &str = "no manifests to process";
pub const IMPORT_SUCCESS_MESSAGE: &str = "import completed";

/// Outcome of one manifest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestResult {
    pub status: u8,
    pub message: String,
    pub id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_failures: Option<u32>,
}

impl ManifestResult {
    /// Committed manifest. Mentions failed invoices when there were any.
    pub fn committed(shipment_id: DbId, succeeded: u32, failed: u32) -> Self {
        let message = if failed > 0 {
            format!("{IMPORT_SUCCESS_MESSAGE} (some invoices failed: {failed})")
        } else {
            IMPORT_SUCCESS_MESSAGE.to_string()
        };
        Self {
            status: STATUS_OK,
            message,
            id: Some(shipment_id),
            invoice_count: Some(succeeded),
            invoice_failures: (failed > 0).then_some(failed),
        }
    }

    pub fn failed(err: &IngestError) -> Self {
        Self::failed_with(err.to_string())
    }

    fn failed_with(message: String) -> Self {
        Self {
            status: STATUS_FAILED,
            message,
            id: None,
            invoice_count: None,
            invoice_failures: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// Shape of a batch outcome, which decides the HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Empty,
    AllFailed,
    Partial,
    AllSucceeded,
}

impl BatchOutcome {
    pub fn of(results: &[ManifestResult]) -> Self {
        if results.is_empty() {
            Self::Empty
        } else if all_succeeded(results) {
            Self::AllSucceeded
        } else if all_failed(results) {
            Self::AllFailed
        } else {
            Self::Partial
        }
    }

    pub fn http_status(self) -> u16 {
        match self {
            Self::Empty | Self::AllFailed => 400,
            Self::Partial => 207,
            Self::AllSucceeded => 200,
        }
    }
}

pub fn all_succeeded(results: &[ManifestResult]) -> bool {
    results.iter().all(ManifestResult::is_success)
}

pub fn any_failed(results: &[ManifestResult]) -> bool {
    results.iter().any(|r| !r.is_success())
}

pub fn all_failed(results: &[ManifestResult]) -> bool {
    results.iter().all(|r| !r.is_success())
}

/// Response body of `POST /emissao`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub message: String,
    pub status: u8,
    pub data: Vec<ManifestResult>,
    #[serde(skip)]
    outcome: BatchOutcome,
}

impl BatchResponse {
    pub fn from_results(data: Vec<ManifestResult>) -> Self {
        if data.is_empty() {
            return Self::empty();
        }
        let ok = all_succeeded(&data);
        Self {
            outcome: BatchOutcome::of(&data),
            message: if ok {
                BATCH_SUCCESS_MESSAGE
            } else {
                BATCH_FAILURE_MESSAGE
            }
            .to_string(),
            status: if ok { STATUS_OK } else { STATUS_FAILED },
            data,
        }
    }

    /// Response for a batch without manifests.
    pub fn empty() -> Self {
        Self {
            message: EMPTY_BATCH_MESSAGE.to_string(),
            status: STATUS_FAILED,
            data: vec![ManifestResult::failed_with(NO_MANIFESTS_MESSAGE.to_string())],
            outcome: BatchOutcome::Empty,
        }
    }

    /// A batch without manifests stays `Empty` even though it carries a
    /// placeholder record.
    pub fn outcome(&self) -> BatchOutcome {
        self.outcome
    }

    pub fn http_status(&self) -> u16 {
        self.outcome().http_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(id: DbId) -> ManifestResult {
        ManifestResult::committed(id, 1, 0)
    }

    fn fail() -> ManifestResult {
        ManifestResult::failed(&IngestError::Validation("bad".into()))
    }

    #[test]
    fn http_status_follows_the_outcome() {
        assert_eq!(BatchOutcome::of(&[]).http_status(), 400);
        assert_eq!(BatchOutcome::of(&[fail()]).http_status(), 400);
        assert_eq!(BatchOutcome::of(&[ok(1), fail()]).http_status(), 207);
        assert_eq!(BatchOutcome::of(&[ok(1), ok(2)]).http_status(), 200);
    }

    #[test]
    fn empty_batch_response() {
        let response = BatchResponse::from_results(Vec::new());
        assert_eq!(response.status, 0);
        assert_eq!(response.http_status(), 400);
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].message, NO_MANIFESTS_MESSAGE);
        assert_eq!(response.data[0].id, None);
    }

    #[test]
    fn global_status_is_one_only_when_everything_succeeded() {
        let all_ok = BatchResponse::from_results(vec![ok(1), ok(2)]);
        assert_eq!(all_ok.status, 1);
        assert_eq!(all_ok.message, BATCH_SUCCESS_MESSAGE);

        let mixed = BatchResponse::from_results(vec![ok(1), fail()]);
        assert_eq!(mixed.status, 0);
        assert_eq!(mixed.message, BATCH_FAILURE_MESSAGE);
        assert_eq!(mixed.http_status(), 207);
        assert!(any_failed(&mixed.data));
        assert!(!all_failed(&mixed.data));
    }

    #[test]
    fn partial_invoice_failure_is_reported() {
        let result = ManifestResult::committed(7, 2, 1);
        assert_eq!(result.status, 1);
        assert_eq!(result.message, "import completed (some invoices failed: 1)");
        assert_eq!(result.invoice_failures, Some(1));

        let clean = ManifestResult::committed(8, 3, 0);
        assert_eq!(clean.message, IMPORT_SUCCESS_MESSAGE);
        assert_eq!(clean.invoice_failures, None);
    }

    #[test]
    fn failure_serializes_without_counts() {
        let json = serde_json::to_value(fail()).unwrap();
        assert_eq!(json["status"], 0);
        assert!(json["id"].is_null());
        assert!(json.get("invoice_count").is_none());
        assert_eq!(json["message"], "validation error: bad");
    }
}

//! PROCEDA prefat (pre-invoice) reception.
//!
//! A carrier posts a pointer to a PROCEDA 5.0 file instead of the file
//! itself. The file is fetched, stored base64-encoded and acknowledged with a
//! `{code, message, status}` reply.

use serde::{Deserialize, Serialize};

/// The only layout accepted.
pub const PROCEDA50_LAYOUT: &str = "PROCEDA50";

/// Body of `POST /prefat`.
///
/// ```json
/// { "layout": "PROCEDA50", "data": { "http": { "url": "https://..." } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrefatRequest {
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub data: PrefatData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PrefatData {
    #[serde(default)]
    pub http: HttpSource,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HttpSource {
    #[serde(default)]
    pub url: String,
}

/// Why a prefat request was refused before anything was fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PrefatRejection {
    #[error("invalid layout")]
    Layout,
    #[error("invalid URL")]
    Url,
}

impl PrefatRequest {
    /// The file location, once the layout has been checked.
    ///
    /// The layout is compared exactly. The URL is trimmed and must not be
    /// blank; whether it is fetchable is decided by the caller.
    pub fn source_url(&self) -> Result<&str, PrefatRejection> {
        if self.layout != PROCEDA50_LAYOUT {
            return Err(PrefatRejection::Layout);
        }
        let url = self.data.http.url.trim();
        if url.is_empty() {
            return Err(PrefatRejection::Url);
        }
        Ok(url)
    }
}

/// Acknowledgement returned by `POST /prefat`: `code` 1 and `status` true on
/// success, 0 and false otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefatReply {
    pub code: u8,
    pub message: String,
    pub status: bool,
}

impl PrefatReply {
    pub fn received() -> Self {
        Self {
            code: 1,
            message: "file received".to_string(),
            status: true,
        }
    }

    pub fn rejected(reason: PrefatRejection) -> Self {
        Self::failure(reason.to_string())
    }

    /// The file could not be fetched or stored.
    pub fn reception_failed() -> Self {
        Self::failure("file reception failed".to_string())
    }

    fn failure(message: String) -> Self {
        Self {
            code: 0,
            message,
            status: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn request(body: serde_json::Value) -> PrefatRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn accepts_proceda50_with_url() {
        let req = request(json!({
            "layout": "PROCEDA50",
            "data": { "http": { "url": "  https://edi.example/prefat.txt " } }
        }));
        assert_eq!(req.source_url(), Ok("https://edi.example/prefat.txt"));
    }

    #[test]
    fn layout_is_checked_before_url() {
        let req = request(json!({ "layout": "proceda50", "data": { "http": { "url": "" } } }));
        assert_matches!(req.source_url(), Err(PrefatRejection::Layout));
    }

    #[test]
    fn blank_or_missing_url_is_rejected() {
        let blank = request(json!({ "layout": "PROCEDA50", "data": { "http": { "url": "  " } } }));
        assert_matches!(blank.source_url(), Err(PrefatRejection::Url));

        let missing = request(json!({ "layout": "PROCEDA50" }));
        assert_matches!(missing.source_url(), Err(PrefatRejection::Url));
    }

    #[test]
    fn replies_carry_code_and_status() {
        assert_eq!(
            serde_json::to_value(PrefatReply::received()).unwrap(),
            json!({ "code": 1, "message": "file received", "status": true })
        );
        let rejected = PrefatReply::rejected(PrefatRejection::Layout);
        assert_eq!((rejected.code, rejected.status), (0, false));
        assert_eq!(rejected.message, "invalid layout");
    }
}

//! Tracking event codes and the status value stored on a shipment.
//!
//! Clients send the new status in several shapes (`"1"`, `1`, `{"code": "1"}`
//! or a JSON string wrapping that object). [`StatusCodeInput`] accepts all of
//! them and [`StatusCodeInput::normalize`] reduces them to a bare code before
//! anything is looked up.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Broad category of a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingKind {
    Pickup,
    InTransit,
    Occurrence,
    Delivered,
}

/// One entry of the tracking-code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingCode {
    pub code: &'static str,
    pub message: &'static str,
    pub kind: TrackingKind,
}

/// Known tracking codes. Anything else is rejected on status change.
pub const TRACKING_CODES: &[TrackingCode] = &[
    TrackingCode {
        code: "1",
        message: "delivered",
        kind: TrackingKind::Delivered,
    },
    TrackingCode {
        code: "2",
        message: "in transit",
        kind: TrackingKind::InTransit,
    },
    TrackingCode {
        code: "3",
        message: "out for delivery",
        kind: TrackingKind::InTransit,
    },
    TrackingCode {
        code: "4",
        message: "receiver absent",
        kind: TrackingKind::Occurrence,
    },
    TrackingCode {
        code: "5",
        message: "address not found",
        kind: TrackingKind::Occurrence,
    },
    TrackingCode {
        code: "6",
        message: "delivery refused",
        kind: TrackingKind::Occurrence,
    },
    TrackingCode {
        code: "10",
        message: "pickup completed",
        kind: TrackingKind::Pickup,
    },
    TrackingCode {
        code: "11",
        message: "arrived at unit",
        kind: TrackingKind::InTransit,
    },
];

/// Look up a tracking code by its textual form.
pub fn find_tracking_code(code: &str) -> Option<&'static TrackingCode> {
    TRACKING_CODES.iter().find(|entry| entry.code == code)
}

// ---------------------------------------------------------------------------
// Input normalization
// ---------------------------------------------------------------------------

/// Status code as received on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StatusCodeInput {
    Number(i64),
    Text(String),
    Object { code: serde_json::Value },
}

impl Default for StatusCodeInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl StatusCodeInput {
    /// Reduce the input to a trimmed code string. `None` when nothing usable
    /// was provided.
    pub fn normalize(&self) -> Option<String> {
        let code = match self {
            Self::Number(n) => n.to_string(),
            Self::Object { code } => code_from_value(code)?,
            Self::Text(raw) => {
                let raw = raw.trim();
                if raw.starts_with('{') {
                    match serde_json::from_str::<serde_json::Value>(raw) {
                        Ok(serde_json::Value::Object(map)) => match map.get("code") {
                            Some(code) => code_from_value(code)?,
                            None => raw.to_string(),
                        },
                        _ => raw.to_string(),
                    }
                } else {
                    raw.to_string()
                }
            }
        };
        if code.is_empty() {
            None
        } else {
            Some(code)
        }
    }

    /// Normalize and resolve against [`TRACKING_CODES`].
    pub fn resolve(&self) -> Result<ShipmentStatus, CoreError> {
        let code = self.normalize().ok_or_else(|| {
            CoreError::Validation(
                "invalid novo_status: send only the code, e.g. {\"novo_status\": \"1\"}".into(),
            )
        })?;
        ShipmentStatus::from_code(&code)
    }
}

fn code_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Stored status
// ---------------------------------------------------------------------------

/// Status persisted as JSON on the shipment row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentStatus {
    pub code: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: TrackingKind,
}

impl ShipmentStatus {
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        let entry = find_tracking_code(code)
            .ok_or_else(|| CoreError::Validation(format!("unknown tracking code: {code}")))?;
        Ok(Self {
            code: entry.code.to_string(),
            message: entry.message.to_string(),
            kind: entry.kind,
        })
    }
}

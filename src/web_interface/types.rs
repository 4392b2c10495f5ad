use serde::{Deserialize, Serialize};

use crate::storage::types::AlertEvent;

/// Structured failure payload returned by every route.
#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Plain acknowledgement for write endpoints.
#[derive(Serialize)]
pub struct SuccessBody {
    pub success: bool,
}

impl SuccessBody {
    pub fn new() -> Self {
        Self { success: true }
    }
}

impl Default for SuccessBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Acknowledgement carrying the updated alert, for the handle endpoint.
#[derive(Serialize)]
pub struct HandledBody {
    pub success: bool,
    pub alert: AlertEvent,
}

/// Body of `PUT /alert/:alertId/handle`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleRequest {
    #[serde(default)]
    pub handled_by: String,
}

/// Body of `POST /session/:sessionId/kill`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillProcessRequest {
    #[serde(default)]
    pub process_id: String,
}

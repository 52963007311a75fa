use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use stockrelay_core::Envelope;

/// Server → Client: first frame on every WS connection.
/// Wire: `{ "type": "history", "messages": [ {envelope}, ... ] }`
///
/// Live envelopes that follow are sent bare, not wrapped in a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFrame {
    #[serde(rename = "type")]
    pub frame_type: String,
    pub messages: Vec<Envelope>,
}

impl HistoryFrame {
    pub fn new(messages: Vec<Envelope>) -> Self {
        Self {
            frame_type: "history".to_string(),
            messages,
        }
    }
}

/// POST /api/messages body.
/// Both fields are optional at the type level so a missing one is reported
/// as a 400 with a readable message instead of a serde rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub queue: Option<String>,
    #[serde(default)]
    pub message: Option<Value>,
}

/// 201 body for an accepted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub data: Map<String, Value>,
}

impl SubmitResponse {
    pub fn accepted(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            message: "Message sent successfully".to_string(),
            data,
        }
    }
}

/// Error body shared by every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
            required: None,
            missing: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// GET /api/health body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBody {
    pub status: String,
    pub messages_count: usize,
    pub subscribers: usize,
    pub broker_connected: bool,
}

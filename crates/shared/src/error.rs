use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error envelope the API uses for non-2xx responses: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// Single failure type surfaced by every remote operation. Transport
/// failures, non-2xx statuses and decode failures all collapse into this,
/// carrying the server `detail` when one was decodable and a per-operation
/// fallback message otherwise.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiFailure {
    pub message: String,
}

impl ApiFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

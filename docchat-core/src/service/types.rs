//! Wire types for the document QA service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /chat/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub history: Vec<String>,
}

/// Reply to a chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReply {
    /// Answer text
    pub answer: String,
    /// Citations backing the answer
    #[serde(default)]
    pub sources: Vec<String>,
    /// Full conversation history as the service wants it sent next time
    #[serde(default)]
    pub updated_history: Vec<String>,
}

/// Outcome flag of `POST /upload_and_process/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Error,
}

/// Body returned by `POST /upload_and_process/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub status: UploadStatus,
}

/// A document the service accepted and finished ingesting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    /// Name of the uploaded file
    pub file_name: String,
    /// Server message ("File processed successfully")
    pub message: String,
}

/// Error body produced by the service framework on non-2xx replies.
///
/// `detail` is usually a string but validation failures send a list.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    pub(crate) fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::String(_) | Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

//! Bridge wire schema.
//!
//! ```text
//! Request  = { action: "checkServerStatus"|"clearStorage"|"saveState"|"loadState", state?: object }
//! Response = { status?, success?, data?, error? }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reply text for a request whose `action` is not a known verb.
pub const UNKNOWN_ACTION: &str = "Unknown action";

/// Reachability of the document service as seen by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// A probe is in flight
    Checking,
    Online,
    Offline,
}

impl ServerStatus {
    pub fn from_probe(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Checking => write!(f, "checking"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A request from the panel to the background context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum BridgeRequest {
    /// Probe the document service
    CheckServerStatus,
    /// Wipe the state store
    ClearStorage,
    /// Upsert every key of `state`
    SaveState { state: Map<String, Value> },
    /// Read the store, optionally only some keys
    LoadState {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        keys: Option<Vec<String>>,
    },
}

impl BridgeRequest {
    /// Every verb on the wire.
    pub const ACTIONS: [&'static str; 4] =
        ["checkServerStatus", "clearStorage", "saveState", "loadState"];

    /// Load the whole store.
    pub fn load_all() -> Self {
        Self::LoadState { keys: None }
    }

    /// Wire name of this request's verb.
    pub fn action(&self) -> &'static str {
        match self {
            Self::CheckServerStatus => "checkServerStatus",
            Self::ClearStorage => "clearStorage",
            Self::SaveState { .. } => "saveState",
            Self::LoadState { .. } => "loadState",
        }
    }

    /// Decode a raw wire request.
    ///
    /// Unknown verbs and malformed payloads come back as the error response
    /// the caller should send.
    pub fn from_json(raw: Value) -> Result<Self, BridgeResponse> {
        let action = match raw.get("action") {
            Some(Value::String(action)) => action.clone(),
            Some(_) | None => return Err(BridgeResponse::error(UNKNOWN_ACTION)),
        };
        if !Self::ACTIONS.iter().any(|known| *known == action) {
            return Err(BridgeResponse::error(UNKNOWN_ACTION));
        }
        serde_json::from_value(raw)
            .map_err(|e| BridgeResponse::error(format!("Malformed {} request: {}", action, e)))
    }
}

/// The single reply to a [`BridgeRequest`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ServerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BridgeResponse {
    /// `{status, success}` for a health probe.
    pub fn server_status(online: bool) -> Self {
        Self {
            status: Some(ServerStatus::from_probe(online)),
            success: Some(online),
            ..Default::default()
        }
    }

    /// `{success: true}`.
    pub fn ack() -> Self {
        Self {
            success: Some(true),
            ..Default::default()
        }
    }

    /// `{data}`.
    pub fn data(data: Map<String, Value>) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// `{error}`.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    /// `{success: false, error}`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            ..Self::error(message)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

//! Persisted record shape and change notifications.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::session::Message;

/// Store key for the ready flag.
pub const KEY_DOCUMENT_UPLOADED: &str = "documentUploaded";
/// Store key for the server-owned history.
pub const KEY_CHAT_HISTORY: &str = "chatHistory";
/// Store key for the message log.
pub const KEY_MESSAGES: &str = "messages";

/// The session fields that outlive the panel.
///
/// Missing keys decode to their defaults, so an empty store reads as a
/// freshly installed session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedState {
    pub document_uploaded: bool,
    pub chat_history: Vec<String>,
    pub messages: Vec<Message>,
}

impl PersistedState {
    /// Flatten into store entries, one per key.
    pub fn to_entries(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            // A struct always serializes to an object
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Ok(map)
            }
        }
    }

    /// Decode from store entries. Unknown keys are ignored.
    pub fn from_entries(entries: Map<String, Value>) -> Result<Self> {
        Ok(serde_json::from_value(Value::Object(entries))?)
    }
}

/// A change applied to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreChange {
    /// These keys were written
    Set { keys: Vec<String> },
    /// Every key was removed
    Cleared,
}

//! Persistent state store.
//!
//! A flat key-value store that outlives the interactive panel. Values are
//! JSON; the session occupies three keys (`documentUploaded`,
//! `chatHistory`, `messages`). Writers always send whole-record updates so
//! interleaved writers cannot leave a half-updated session behind.

mod schema;
mod sqlite;
mod types;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStateStore;
pub use types::{
    PersistedState, StoreChange, KEY_CHAT_HISTORY, KEY_DOCUMENT_UPLOADED, KEY_MESSAGES,
};

use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::info;

use crate::error::Result;

/// Key-value store with change notifications.
pub trait StateStore: Send + Sync {
    /// Read entries. `None` returns every key; missing keys are omitted.
    fn get(&self, keys: Option<&[String]>) -> Result<Map<String, Value>>;

    /// Upsert every entry atomically.
    fn set(&self, entries: &Map<String, Value>) -> Result<()>;

    /// Remove every key.
    fn clear(&self) -> Result<()>;

    /// Receive a notification after each successful write.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    /// Whether the store holds no keys.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.get(None)?.is_empty())
    }
}

/// Seed install defaults into an empty store.
///
/// Returns `true` when defaults were written.
pub fn seed_defaults(store: &dyn StateStore) -> Result<bool> {
    if !store.is_empty()? {
        return Ok(false);
    }
    store.set(&PersistedState::default().to_entries()?)?;
    info!("Seeded state store with install defaults");
    Ok(true)
}

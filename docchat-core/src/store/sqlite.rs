//! SQLite-backed state store implementation.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::store::schema::{initialize_schema, is_initialized};
use crate::store::types::StoreChange;
use crate::store::StateStore;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// SQLite-backed flat key-value store.
pub struct SqliteStateStore {
    conn: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStateStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Storage(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;

        if !is_initialized(&conn) {
            initialize_schema(&conn)?;
        }

        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory store (for testing and ephemeral runs).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            conn: Arc::new(Mutex::new(conn)),
            changes,
        }
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock connection: {}", e)))?;
        f(&conn).map_err(Error::from)
    }

    fn notify(&self, change: StoreChange) {
        // No subscribers is fine
        let _ = self.changes.send(change);
    }

    fn decode(key: &str, raw: &str) -> Result<Value> {
        serde_json::from_str(raw)
            .map_err(|e| Error::Storage(format!("Corrupt value for key {:?}: {}", key, e)))
    }
}

impl StateStore for SqliteStateStore {
    fn get(&self, keys: Option<&[String]>) -> Result<Map<String, Value>> {
        let rows: Vec<(String, String)> = match keys {
            None => self.with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT key, value FROM kv ORDER BY key")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })?,
            Some(keys) => self.with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
                let mut rows = Vec::with_capacity(keys.len());
                for key in keys {
                    if let Some(value) = stmt
                        .query_row(params![key], |row| row.get::<_, String>(0))
                        .optional()?
                    {
                        rows.push((key.clone(), value));
                    }
                }
                Ok(rows)
            })?,
        };

        let mut entries = Map::new();
        for (key, raw) in rows {
            let value = Self::decode(&key, &raw)?;
            entries.insert(key, value);
        }
        Ok(entries)
    }

    fn set(&self, entries: &Map<String, Value>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let encoded = entries
            .iter()
            .map(|(k, v)| Ok((k.clone(), serde_json::to_string(v)?)))
            .collect::<Result<Vec<_>>>()?;

        self.with_conn(|conn| {
            // All keys land together or not at all
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                    updated_at = excluded.updated_at",
                )?;
                for (key, value) in &encoded {
                    stmt.execute(params![key, value])?;
                }
            }
            tx.commit()
        })?;

        self.notify(StoreChange::Set {
            keys: entries.keys().cloned().collect(),
        });
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.with_conn(|conn| conn.execute("DELETE FROM kv", []).map(|_| ()))?;
        self.notify(StoreChange::Cleared);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}

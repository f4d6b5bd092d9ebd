//! Shared fakes for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::bridge::{BridgeClient, BridgeHost, DEFAULT_BRIDGE_CAPACITY};
use crate::error::Result;
use crate::service::{DocumentUpload, IngestReceipt, RemoteService, TurnReply};
use crate::store::SqliteStateStore;

/// A [`RemoteService`] that replays queued results.
///
/// With an empty queue, ingest succeeds and each turn answers by echoing the
/// question and appending one summary to the history it was sent.
pub(crate) struct ScriptedService {
    online: AtomicBool,
    ingest_calls: AtomicUsize,
    turn_calls: AtomicUsize,
    ingest_results: Mutex<VecDeque<Result<IngestReceipt>>>,
    turn_results: Mutex<VecDeque<Result<TurnReply>>>,
    last_history: Mutex<Option<Vec<String>>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            ingest_calls: AtomicUsize::new(0),
            turn_calls: AtomicUsize::new(0),
            ingest_results: Mutex::new(VecDeque::new()),
            turn_results: Mutex::new(VecDeque::new()),
            last_history: Mutex::new(None),
            gate: Mutex::new(None),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn push_ingest(&self, result: Result<IngestReceipt>) {
        self.ingest_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn push_turn(&self, result: Result<TurnReply>) {
        self.turn_results.lock().unwrap().push_back(result);
    }

    pub(crate) fn ingest_calls(&self) -> usize {
        self.ingest_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn turn_calls(&self) -> usize {
        self.turn_calls.load(Ordering::SeqCst)
    }

    /// History sent with the most recent turn.
    pub(crate) fn last_history(&self) -> Option<Vec<String>> {
        self.last_history.lock().unwrap().clone()
    }

    /// Make every turn wait for a notification before answering.
    pub(crate) fn hold_turns(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Wait until at least `n` turns have reached the service.
    pub(crate) async fn wait_for_turn_call(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.turn_calls() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("turn call never arrived");
    }
}

#[async_trait]
impl RemoteService for ScriptedService {
    async fn probe_health(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn ingest_document(&self, upload: DocumentUpload) -> Result<IngestReceipt> {
        self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.ingest_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(IngestReceipt {
                file_name: upload.file_name.clone(),
                message: format!("Successfully processed {}", upload.file_name),
            })
        })
    }

    async fn send_turn(&self, question: &str, history: &[String]) -> Result<TurnReply> {
        *self.last_history.lock().unwrap() = Some(history.to_vec());
        self.turn_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let scripted = self.turn_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let answer = format!("Answer to: {}", question);
            let mut updated_history = history.to_vec();
            updated_history.push(format!("Q: {} A: {}", question, answer));
            Ok(TurnReply {
                answer,
                sources: Vec::new(),
                updated_history,
            })
        })
    }
}

/// Spawn a bridge host over an in-memory store.
pub(crate) fn spawn_bridge(service: Arc<ScriptedService>) -> (BridgeClient, Arc<SqliteStateStore>) {
    let store = Arc::new(SqliteStateStore::in_memory().unwrap());
    let host = BridgeHost::new(store.clone(), service);
    let (client, _handle) = host.spawn(DEFAULT_BRIDGE_CAPACITY);
    (client, store)
}

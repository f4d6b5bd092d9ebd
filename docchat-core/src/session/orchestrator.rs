//! The session state machine.
//!
//! ```text
//!   Empty ──start_upload──▶ Uploading ──ok──▶ Ready ──send_message──▶ Sending
//!     ▲                        │                ▲  │                     │
//!     └────────fail────────────┘                │  └─clear─┐   ok / fail │
//!                                               └──────────┴─────────────┘
//! ```
//!
//! Illegal transitions are skipped, never errors. The `loading` flag is
//! checked and set under the session lock at the entry of every mutating
//! operation, so two rapid calls cannot both get through.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::bridge::BridgeClient;
use crate::config::MAX_UPLOAD_BYTES;
use crate::error::{Error, Result};
use crate::events::{EventBridge, SessionEvent, SessionEventKind};
use crate::service::{validate_upload, DocumentUpload, IngestReceipt, RemoteService};

use super::types::{Message, Session, SessionPhase};

/// Why an operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another remote call is outstanding
    Busy,
    /// No document has been ingested
    NotReady,
    /// The question was blank
    EmptyInput,
}

/// Result of [`SessionOrchestrator::start_upload`].
#[derive(Debug)]
pub enum UploadOutcome {
    /// The document is ingested; the session is `Ready`
    Processed(IngestReceipt),
    /// Validation or ingest failed; `last_error` holds the message
    Failed(Error),
    Skipped(SkipReason),
}

impl UploadOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed(_))
    }
}

/// Result of [`SessionOrchestrator::send_message`].
#[derive(Debug)]
pub enum TurnOutcome {
    /// The assistant answer that was appended
    Answered(Message),
    /// The turn failed; an error message was appended
    Failed(Error),
    Skipped(SkipReason),
}

impl TurnOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, Self::Answered(_))
    }
}

/// Owns the session and routes every mutation.
///
/// Presentation code reads [`snapshot`](Self::snapshot) and listens to
/// [`subscribe`](Self::subscribe); it never mutates the session itself.
pub struct SessionOrchestrator {
    service: Arc<dyn RemoteService>,
    bridge: BridgeClient,
    session: RwLock<Session>,
    events: EventBridge,
    persist_lock: Mutex<()>,
    max_upload_bytes: u64,
}

impl SessionOrchestrator {
    /// Create an orchestrator over a fresh session.
    pub fn new(service: Arc<dyn RemoteService>, bridge: BridgeClient) -> Self {
        Self {
            service,
            bridge,
            session: RwLock::new(Session::new()),
            events: EventBridge::default(),
            persist_lock: Mutex::new(()),
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }

    /// Set the upload size ceiling.
    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Copy of the current session.
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.session.read().await.phase()
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Upload a document and wait for ingestion.
    ///
    /// Any previous conversation is dropped. Type and size are checked
    /// first; a rejected file never reaches the network and leaves the
    /// session `Empty` with `last_error` set. Otherwise the session passes
    /// through `Uploading` and ends in `Ready` on success or `Empty` on
    /// failure.
    pub async fn start_upload(&self, upload: DocumentUpload) -> UploadOutcome {
        let rejected = {
            let mut session = self.session.write().await;
            if session.loading {
                debug!("Upload skipped: session busy");
                return UploadOutcome::Skipped(SkipReason::Busy);
            }

            let from = session.phase();
            session.document_ready = false;
            session.reset_conversation();
            match validate_upload(&upload, self.max_upload_bytes) {
                Err(e) => {
                    info!(file = %upload.file_name, "Upload rejected: {}", e);
                    session.last_error = Some(e.to_string());
                    self.emit_phase(from, session.phase());
                    self.events
                        .emit(SessionEventKind::Error(e.to_string()), session.phase());
                    Some(e)
                }
                Ok(()) => {
                    session.loading = true;
                    session.last_error = None;
                    self.emit_phase(from, session.phase());
                    None
                }
            }
        };
        self.persist().await;
        if let Some(e) = rejected {
            return UploadOutcome::Failed(e);
        }

        let result = self.service.ingest_document(upload).await;

        let outcome = {
            let mut session = self.session.write().await;
            let from = session.phase();
            session.loading = false;
            match result {
                Ok(receipt) => {
                    info!(file = %receipt.file_name, "Document ready");
                    session.document_ready = true;
                    session.last_error = None;
                    session.reset_conversation();
                    self.emit_phase(from, session.phase());
                    UploadOutcome::Processed(receipt)
                }
                Err(e) => {
                    warn!(kind = %e.kind(), "Upload failed: {}", e);
                    session.document_ready = false;
                    session.last_error = Some(e.to_string());
                    self.emit_phase(from, session.phase());
                    self.events
                        .emit(SessionEventKind::Error(e.to_string()), session.phase());
                    UploadOutcome::Failed(e)
                }
            }
        };
        self.persist().await;
        outcome
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Ask a question about the ingested document.
    ///
    /// The trimmed question is appended as a user message when the turn
    /// starts. On success the answer is appended and the conversation
    /// history is replaced with the server's. On failure one assistant
    /// message carrying the error text is appended and the history is left
    /// untouched.
    pub async fn send_message(&self, input: &str) -> TurnOutcome {
        let question = input.trim();
        if question.is_empty() {
            return TurnOutcome::Skipped(SkipReason::EmptyInput);
        }

        let history = {
            let mut session = self.session.write().await;
            if session.loading {
                debug!("Send skipped: session busy");
                return TurnOutcome::Skipped(SkipReason::Busy);
            }
            if !session.document_ready {
                debug!("Send skipped: no document");
                return TurnOutcome::Skipped(SkipReason::NotReady);
            }

            let from = session.phase();
            session.loading = true;
            let user = Message::user(question);
            session.messages.push(user.clone());
            self.emit_phase(from, session.phase());
            self.events
                .emit(SessionEventKind::MessageAppended(user), session.phase());
            session.conversation_history.clone()
        };
        self.persist().await;

        let result = self.service.send_turn(question, &history).await;

        let outcome = {
            let mut session = self.session.write().await;
            let from = session.phase();
            session.loading = false;
            match result {
                Ok(reply) => {
                    let answer = Message::answer(reply.answer, reply.sources);
                    session.messages.push(answer.clone());
                    session.conversation_history = reply.updated_history;
                    let len = session.conversation_history.len();
                    self.emit_phase(from, session.phase());
                    self.events.emit(
                        SessionEventKind::MessageAppended(answer.clone()),
                        session.phase(),
                    );
                    self.events
                        .emit(SessionEventKind::HistoryReplaced { len }, session.phase());
                    TurnOutcome::Answered(answer)
                }
                Err(e) => {
                    warn!(kind = %e.kind(), "Chat turn failed: {}", e);
                    let message = Message::error(&e);
                    session.messages.push(message.clone());
                    self.emit_phase(from, session.phase());
                    self.events
                        .emit(SessionEventKind::MessageAppended(message), session.phase());
                    TurnOutcome::Failed(e)
                }
            }
        };
        self.persist().await;
        outcome
    }

    // =========================================================================
    // Housekeeping
    // =========================================================================

    /// Empty messages and history, keeping the document.
    ///
    /// Returns `false` when skipped because a call is outstanding.
    pub async fn clear(&self) -> bool {
        {
            let mut session = self.session.write().await;
            if session.loading {
                debug!("Clear skipped: session busy");
                return false;
            }
            session.reset_conversation();
            session.last_error = None;
            self.events.emit(SessionEventKind::Cleared, session.phase());
        }
        self.persist().await;
        true
    }

    /// Wipe the store and return the session to install defaults.
    ///
    /// Returns `Ok(false)` when skipped because a call is outstanding.
    pub async fn reset(&self) -> Result<bool> {
        // Same lock order as `persist`: no save may land after the wipe
        let _persisting = self.persist_lock.lock().await;
        let mut session = self.session.write().await;
        if session.loading {
            debug!("Reset skipped: session busy");
            return Ok(false);
        }
        self.bridge.clear_storage().await?;

        let from = session.phase();
        *session = Session::new();
        self.emit_phase(from, session.phase());
        self.events.emit(SessionEventKind::Cleared, session.phase());
        info!("Session reset");
        Ok(true)
    }

    /// Reload the session from the store.
    ///
    /// Returns `Ok(false)` when skipped because a call is outstanding.
    pub async fn restore(&self) -> Result<bool> {
        let _persisting = self.persist_lock.lock().await;
        let mut session = self.session.write().await;
        if session.loading {
            debug!("Restore skipped: session busy");
            return Ok(false);
        }
        let state = self.bridge.load_state().await?;

        let from = session.phase();
        *session = Session::from_persisted(state);
        self.emit_phase(from, session.phase());
        self.events.emit(SessionEventKind::Restored, session.phase());
        debug!(
            ready = session.document_ready,
            messages = session.messages.len(),
            "Session restored"
        );
        Ok(true)
    }

    fn emit_phase(&self, from: SessionPhase, to: SessionPhase) {
        if from != to {
            debug!(%from, %to, "Session phase changed");
            self.events
                .emit(SessionEventKind::PhaseChanged { from, to }, to);
        }
    }

    /// Write the whole persisted record. Failures are logged, not returned.
    ///
    /// Takes `persist_lock` before the session lock; `reset` and `restore`
    /// do the same, so a save is never in flight across a wipe or reload.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        let state = self.session.read().await.to_persisted();
        if let Err(e) = self.bridge.save_state(&state).await {
            warn!("Failed to persist session: {}", e);
        }
    }
}

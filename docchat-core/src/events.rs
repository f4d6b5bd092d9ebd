//! Session change notifications.
//!
//! Presentation code subscribes here and re-renders from a fresh session
//! snapshot whenever an event arrives. Events are informational only; the
//! snapshot is always the source of truth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::{Message, SessionPhase};

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// The phase moved
    PhaseChanged { from: SessionPhase, to: SessionPhase },
    /// A message was appended
    MessageAppended(Message),
    /// The server replaced the conversation history
    HistoryReplaced { len: usize },
    /// Messages and history were emptied
    Cleared,
    /// State was reloaded from the store
    Restored,
    /// An operation failed; the text is user-presentable
    Error(String),
}

/// A change notification stamped with the phase after the change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub phase: SessionPhase,
    pub timestamp: DateTime<Utc>,
}

impl SessionEvent {
    pub fn new(kind: SessionEventKind, phase: SessionPhase) -> Self {
        Self {
            kind,
            phase,
            timestamp: Utc::now(),
        }
    }

    /// Get the event type name.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            SessionEventKind::PhaseChanged { .. } => "phase_changed",
            SessionEventKind::MessageAppended(_) => "message_appended",
            SessionEventKind::HistoryReplaced { .. } => "history_replaced",
            SessionEventKind::Cleared => "cleared",
            SessionEventKind::Restored => "restored",
            SessionEventKind::Error(_) => "error",
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Fan-out of session events to any number of panels.
#[derive(Debug, Clone)]
pub struct EventBridge {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBridge {
    /// Create a bridge with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to session events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Send an event. Dropped silently when nobody listens.
    pub fn emit(&self, kind: SessionEventKind, phase: SessionPhase) {
        let _ = self.sender.send(SessionEvent::new(kind, phase));
    }

    /// Get number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new(256)
    }
}

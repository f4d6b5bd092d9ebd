//! Session state: messages, phases and the per-install conversation record.

use serde::{Deserialize, Serialize};

use crate::store::PersistedState;

/// The role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User/human input
    User,
    /// Service answer or surfaced error
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message shown in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
    /// Citations returned with an answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources: None,
        }
    }

    /// Create an assistant answer with its citations.
    pub fn answer(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            sources: Some(sources),
            ..Self::assistant(content)
        }
    }

    /// Assistant message carrying a failed turn's error text.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::assistant(format!("Error: {}", message))
    }

    /// Citations, empty when none were attached.
    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or(&[])
    }
}

/// Where a session stands, derived from `document_ready` and `loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No document; nothing in flight
    Empty,
    /// A document is being ingested
    Uploading,
    /// Document ingested, waiting for a question
    Ready,
    /// A chat turn is in flight
    Sending,
}

impl SessionPhase {
    pub fn from_flags(document_ready: bool, loading: bool) -> Self {
        match (document_ready, loading) {
            (false, false) => Self::Empty,
            (false, true) => Self::Uploading,
            (true, false) => Self::Ready,
            (true, true) => Self::Sending,
        }
    }

    /// Whether a remote call is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Uploading | Self::Sending)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Uploading => write!(f, "uploading"),
            Self::Ready => write!(f, "ready"),
            Self::Sending => write!(f, "sending"),
        }
    }
}

/// The single conversational state tracked per install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// The service holds an ingested document for this session
    pub document_ready: bool,
    /// Server-owned turn summaries, replaced whole after each turn
    pub conversation_history: Vec<String>,
    /// Messages in creation order
    pub messages: Vec<Message>,
    /// A remote call is outstanding
    pub loading: bool,
    /// Last failure, shown as a status message
    pub last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a session from its persisted fields.
    ///
    /// Transient fields start cleared. A persisted record that claims
    /// messages without a ready document is normalized to empty.
    pub fn from_persisted(state: PersistedState) -> Self {
        let mut session = Self {
            document_ready: state.document_uploaded,
            conversation_history: state.chat_history,
            messages: state.messages,
            loading: false,
            last_error: None,
        };
        if !session.document_ready {
            session.reset_conversation();
        }
        session
    }

    /// Persisted projection of this session.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            document_uploaded: self.document_ready,
            chat_history: self.conversation_history.clone(),
            messages: self.messages.clone(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_flags(self.document_ready, self.loading)
    }

    /// Empty messages and history together.
    pub(crate) fn reset_conversation(&mut self) {
        self.messages.clear();
        self.conversation_history.clear();
    }

    /// `document_ready == false` implies an empty conversation.
    pub fn is_consistent(&self) -> bool {
        self.document_ready || (self.messages.is_empty() && self.conversation_history.is_empty())
    }
}

//! # docchat-core
//!
//! Client core for chatting with a PDF document through a remote
//! question-answering service.
//!
//! ## Core Components
//!
//! - **Service**: HTTP client for the document QA service (upload, chat, health)
//! - **Session**: Conversation state and the orchestrator that drives it
//! - **Store**: Per-install persisted state (SQLite key-value)
//! - **Bridge**: Request/response channel between the long-lived background
//!   context and short-lived panels
//! - **Panel**: Presentation state derived from the session and server status
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docchat_core::{
//!     BridgeHost, DocumentUpload, HttpServiceClient, Panel, ServiceConfig,
//!     SessionOrchestrator, SqliteStateStore, DEFAULT_BRIDGE_CAPACITY,
//! };
//!
//! let config = ServiceConfig::from_env();
//! let service = Arc::new(HttpServiceClient::new(config.clone())?);
//! let store = Arc::new(SqliteStateStore::in_memory()?);
//! let (bridge, _host) = BridgeHost::new(store, service.clone()).spawn(DEFAULT_BRIDGE_CAPACITY);
//!
//! let orchestrator = Arc::new(SessionOrchestrator::new(service, bridge.clone()));
//! let panel = Panel::new(orchestrator.clone(), bridge, &config.base_url);
//! panel.open().await;
//!
//! orchestrator.start_upload(DocumentUpload::from_path("report.pdf", config.max_upload_bytes).await?).await;
//! orchestrator.send_message("What is the summary?").await;
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod panel;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use bridge::{
    BridgeClient, BridgeHost, BridgeRequest, BridgeResponse, ServerStatus,
    DEFAULT_BRIDGE_CAPACITY,
};
pub use config::{ServiceConfig, DEFAULT_BASE_URL, MAX_UPLOAD_BYTES};
pub use error::{Error, ErrorKind, Result};
pub use events::{EventBridge, SessionEvent, SessionEventKind};
pub use panel::{BannerKind, Panel, PanelView, StatusBanner};
pub use service::{
    validate_upload, DocumentUpload, HttpServiceClient, IngestReceipt, RemoteService, TurnReply,
};
pub use session::{
    Message, Role, Session, SessionOrchestrator, SessionPhase, SkipReason, TurnOutcome,
    UploadOutcome,
};
pub use store::{PersistedState, SqliteStateStore, StateStore, StoreChange};

//! Panel-side presentation state.
//!
//! The panel is recreated every time it is opened. It restores the session
//! from the background context, probes the service and exposes a read-only
//! [`PanelView`] that renderers draw from.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::bridge::{BridgeClient, ServerStatus};
use crate::session::{Session, SessionOrchestrator, SessionPhase};

// =============================================================================
// View
// =============================================================================

/// Style of the status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
    Info,
}

/// One-line status shown above the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBanner {
    pub kind: BannerKind,
    pub text: String,
}

impl StatusBanner {
    fn new(kind: BannerKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Pick the banner for a server status and session.
    pub fn for_state(status: ServerStatus, session: &Session, base_url: &str) -> Self {
        match status {
            ServerStatus::Offline => Self::new(
                BannerKind::Error,
                format!(
                    "Server offline - make sure the backend is running on {}",
                    base_url
                ),
            ),
            ServerStatus::Checking => Self::new(BannerKind::Info, "Checking server status..."),
            ServerStatus::Online if session.document_ready => {
                Self::new(BannerKind::Success, "Document ready for chat")
            }
            ServerStatus::Online => Self::new(BannerKind::Info, "Upload a PDF to get started"),
        }
    }
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelView {
    pub server_status: ServerStatus,
    pub phase: SessionPhase,
    pub session: Session,
    pub banner: StatusBanner,
    /// Upload control enabled
    pub can_upload: bool,
    /// Chat input enabled
    pub can_send: bool,
}

impl PanelView {
    pub fn new(server_status: ServerStatus, session: Session, base_url: &str) -> Self {
        let online = server_status.is_online();
        Self {
            server_status,
            phase: session.phase(),
            banner: StatusBanner::for_state(server_status, &session, base_url),
            can_upload: online && !session.loading,
            can_send: online && !session.loading && session.document_ready,
            session,
        }
    }
}

// =============================================================================
// Panel
// =============================================================================

/// A single open panel.
pub struct Panel {
    orchestrator: Arc<SessionOrchestrator>,
    bridge: BridgeClient,
    base_url: String,
    status: RwLock<ServerStatus>,
}

impl Panel {
    pub fn new(
        orchestrator: Arc<SessionOrchestrator>,
        bridge: BridgeClient,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            bridge,
            base_url: base_url.into(),
            status: RwLock::new(ServerStatus::Checking),
        }
    }

    /// Restore the persisted session, then probe the service.
    pub async fn open(&self) -> ServerStatus {
        *self.status.write().await = ServerStatus::Checking;
        if let Err(e) = self.orchestrator.restore().await {
            warn!("Failed to restore session: {}", e);
        }
        self.probe().await
    }

    /// Probe the service again.
    pub async fn retry_connection(&self) -> ServerStatus {
        *self.status.write().await = ServerStatus::Checking;
        self.probe().await
    }

    pub async fn server_status(&self) -> ServerStatus {
        *self.status.read().await
    }

    pub fn orchestrator(&self) -> &Arc<SessionOrchestrator> {
        &self.orchestrator
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot for rendering.
    pub async fn view(&self) -> PanelView {
        let status = self.server_status().await;
        let session = self.orchestrator.snapshot().await;
        PanelView::new(status, session, &self.base_url)
    }

    async fn probe(&self) -> ServerStatus {
        let status = match self.bridge.check_server_status().await {
            Ok(status) => status,
            Err(e) => {
                warn!("Server status check failed: {}", e);
                ServerStatus::Offline
            }
        };
        debug!(%status, "Server status");
        *self.status.write().await = status;
        status
    }
}

//! Panel side of the bridge.

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::PersistedState;

use super::protocol::{BridgeRequest, BridgeResponse, ServerStatus};
use super::BridgeEnvelope;

/// Handle the panel uses to reach the background context.
///
/// Cheap to clone. Every call gets exactly one reply.
#[derive(Clone)]
pub struct BridgeClient {
    tx: mpsc::Sender<BridgeEnvelope>,
}

impl BridgeClient {
    pub(crate) fn channel(capacity: usize) -> (Self, mpsc::Receiver<BridgeEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Send a request and wait for its reply.
    pub async fn request(&self, request: BridgeRequest) -> Result<BridgeResponse> {
        let (reply, response) = oneshot::channel();
        let id = Uuid::new_v4();
        let action = request.action();

        self.tx
            .send(BridgeEnvelope { id, request, reply })
            .await
            .map_err(|_| Error::Internal("Bridge host is not running".to_string()))?;

        response.await.map_err(|_| {
            Error::Internal(format!("Bridge dropped the reply to {} ({})", action, id))
        })
    }

    /// Whether the host side is still accepting requests.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Probe the document service through the background context.
    pub async fn check_server_status(&self) -> Result<ServerStatus> {
        let response = self.request(BridgeRequest::CheckServerStatus).await?;
        Ok(response.status.unwrap_or(ServerStatus::Offline))
    }

    /// Wipe the store.
    pub async fn clear_storage(&self) -> Result<()> {
        let response = self.request(BridgeRequest::ClearStorage).await?;
        into_result(response).map(|_| ())
    }

    /// Write raw entries.
    pub async fn save_entries(&self, state: Map<String, Value>) -> Result<()> {
        let response = self.request(BridgeRequest::SaveState { state }).await?;
        into_result(response).map(|_| ())
    }

    /// Read raw entries; `None` reads every key.
    pub async fn load_entries(&self, keys: Option<Vec<String>>) -> Result<Map<String, Value>> {
        let response = self.request(BridgeRequest::LoadState { keys }).await?;
        Ok(into_result(response)?.data.unwrap_or_default())
    }

    /// Write the whole persisted session.
    pub async fn save_state(&self, state: &PersistedState) -> Result<()> {
        self.save_entries(state.to_entries()?).await
    }

    /// Read the whole persisted session; missing keys take their defaults.
    pub async fn load_state(&self) -> Result<PersistedState> {
        let entries = self.load_entries(None).await?;
        PersistedState::from_entries(entries)
    }
}

fn into_result(response: BridgeResponse) -> Result<BridgeResponse> {
    match response.error {
        Some(message) => Err(Error::Storage(message)),
        None => Ok(response),
    }
}

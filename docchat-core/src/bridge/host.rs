//! Background side of the bridge: owns the store and the health probe.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::service::RemoteService;
use crate::store::{seed_defaults, StateStore};

use super::client::BridgeClient;
use super::protocol::{BridgeRequest, BridgeResponse};
use super::BridgeEnvelope;

/// Default request queue depth.
pub const DEFAULT_BRIDGE_CAPACITY: usize = 32;

/// Serves bridge requests on behalf of the background context.
///
/// Each request runs in its own task that keeps the reply channel until the
/// store or network operation settles, so slow probes never drop replies
/// and never hold up other requests.
#[derive(Clone)]
pub struct BridgeHost {
    store: Arc<dyn StateStore>,
    service: Arc<dyn RemoteService>,
}

impl BridgeHost {
    pub fn new(store: Arc<dyn StateStore>, service: Arc<dyn RemoteService>) -> Self {
        Self { store, service }
    }

    /// Seed install defaults, then serve requests until every client is gone.
    pub fn spawn(self, capacity: usize) -> (BridgeClient, JoinHandle<()>) {
        let (client, rx) = BridgeClient::channel(capacity);
        let handle = tokio::spawn(async move {
            if let Err(e) = self.install().await {
                warn!("Failed to seed install defaults: {}", e);
            }
            self.serve(rx).await;
        });
        (client, handle)
    }

    /// Write install defaults when the store is empty.
    pub async fn install(&self) -> Result<bool> {
        self.with_store(|store| seed_defaults(store)).await
    }

    pub(crate) async fn serve(self, mut rx: mpsc::Receiver<BridgeEnvelope>) {
        info!("Bridge host started");
        while let Some(envelope) = rx.recv().await {
            let host = self.clone();
            tokio::spawn(async move {
                let BridgeEnvelope { id, request, reply } = envelope;
                debug!(%id, action = request.action(), "Bridge request");
                let response = host.handle(request).await;
                if reply.send(response).is_err() {
                    debug!(%id, "Bridge caller went away before the reply");
                }
            });
        }
        info!("Bridge host stopped");
    }

    /// Answer one typed request.
    pub async fn handle(&self, request: BridgeRequest) -> BridgeResponse {
        match request {
            BridgeRequest::CheckServerStatus => {
                let online = self.service.probe_health().await;
                BridgeResponse::server_status(online)
            }
            BridgeRequest::ClearStorage => match self.with_store(|store| store.clear()).await {
                Ok(()) => BridgeResponse::ack(),
                Err(e) => {
                    warn!("clearStorage failed: {}", e);
                    BridgeResponse::failure(e.to_string())
                }
            },
            BridgeRequest::SaveState { state } => {
                match self.with_store(move |store| store.set(&state)).await {
                    Ok(()) => BridgeResponse::ack(),
                    Err(e) => {
                        warn!("saveState failed: {}", e);
                        BridgeResponse::failure(e.to_string())
                    }
                }
            }
            BridgeRequest::LoadState { keys } => {
                match self
                    .with_store(move |store| store.get(keys.as_deref()))
                    .await
                {
                    Ok(data) => BridgeResponse::data(data),
                    Err(e) => {
                        warn!("loadState failed: {}", e);
                        BridgeResponse::error(e.to_string())
                    }
                }
            }
        }
    }

    /// Answer one raw wire request.
    pub async fn handle_json(&self, raw: Value) -> Value {
        let response = match BridgeRequest::from_json(raw) {
            Ok(request) => self.handle(request).await,
            Err(response) => response,
        };
        serde_json::to_value(response).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("Failed to encode response: {}", e) })
        })
    }

    async fn with_store<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn StateStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| Error::Internal(format!("Store task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{DocumentUpload, IngestReceipt, TurnReply};
    use crate::store::{PersistedState, SqliteStateStore};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    struct ProbeOnly {
        online: bool,
        delay: Duration,
    }

    #[async_trait]
    impl RemoteService for ProbeOnly {
        async fn probe_health(&self) -> bool {
            tokio::time::sleep(self.delay).await;
            self.online
        }

        async fn ingest_document(&self, _upload: DocumentUpload) -> Result<IngestReceipt> {
            Err(Error::Internal("not used".into()))
        }

        async fn send_turn(&self, _question: &str, _history: &[String]) -> Result<TurnReply> {
            Err(Error::Internal("not used".into()))
        }
    }

    fn host(online: bool, delay: Duration) -> BridgeHost {
        BridgeHost::new(
            Arc::new(SqliteStateStore::in_memory().unwrap()),
            Arc::new(ProbeOnly { online, delay }),
        )
    }

    #[tokio::test]
    async fn test_handle_json_unknown_action() {
        let host = host(true, Duration::ZERO);
        let reply = host.handle_json(json!({"action": "openTab"})).await;
        assert_eq!(reply, json!({"error": "Unknown action"}));
    }

    #[tokio::test]
    async fn test_check_server_status_reports_failure_as_data() {
        let reply = host(false, Duration::ZERO)
            .handle_json(json!({"action": "checkServerStatus"}))
            .await;
        assert_eq!(reply, json!({"status": "offline", "success": false}));
    }

    #[tokio::test]
    async fn test_install_seeds_defaults_once() {
        let host = host(true, Duration::ZERO);
        assert!(host.install().await.unwrap());
        assert!(!host.install().await.unwrap());

        let reply = host.handle(BridgeRequest::load_all()).await;
        let state = PersistedState::from_entries(reply.data.unwrap()).unwrap();
        assert_eq!(state, PersistedState::default());
    }

    #[tokio::test]
    async fn test_load_state_with_key_filter() {
        let host = host(true, Duration::ZERO);
        host.install().await.unwrap();

        let reply = host
            .handle_json(json!({"action": "loadState", "keys": ["documentUploaded"]}))
            .await;
        assert_eq!(reply, json!({"data": {"documentUploaded": false}}));
    }

    #[tokio::test]
    async fn test_load_state_after_clear_is_empty_on_the_wire() {
        let host = host(true, Duration::ZERO);
        host.install().await.unwrap();
        host.handle_json(json!({
            "action": "saveState",
            "state": {"documentUploaded": true, "chatHistory": ["h1"]}
        }))
        .await;

        let reply = host.handle_json(json!({"action": "clearStorage"})).await;
        assert_eq!(reply, json!({"success": true}));

        // Raw entries are gone; typed decoding fills in the defaults
        let reply = host.handle_json(json!({"action": "loadState"})).await;
        assert_eq!(reply, json!({"data": {}}));
        let entries = reply["data"].as_object().cloned().unwrap();
        assert_eq!(
            PersistedState::from_entries(entries).unwrap(),
            PersistedState::default()
        );
    }

    #[tokio::test]
    async fn test_slow_probe_still_replies() {
        let host = host(true, Duration::from_millis(50));
        let (client, _handle) = host.spawn(4);

        let status = client.check_server_status().await.unwrap();
        assert!(status.is_online());
    }
}

//! Request/response bridge between the background context and the panel.
//!
//! The background context owns the state store and survives panel restarts;
//! the panel may be destroyed and recreated at any time. The panel never
//! touches the store directly. It sends a typed [`BridgeRequest`] through a
//! [`BridgeClient`] and awaits the single [`BridgeResponse`] the
//! [`BridgeHost`] produces for it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use docchat_core::bridge::{BridgeHost, DEFAULT_BRIDGE_CAPACITY};
//!
//! let (bridge, _host) = BridgeHost::new(store, service).spawn(DEFAULT_BRIDGE_CAPACITY);
//! let status = bridge.check_server_status().await?;
//! let state = bridge.load_state().await?;
//! ```

mod client;
mod host;
mod protocol;

pub use client::BridgeClient;
pub use host::{BridgeHost, DEFAULT_BRIDGE_CAPACITY};
pub use protocol::{BridgeRequest, BridgeResponse, ServerStatus, UNKNOWN_ACTION};

use tokio::sync::oneshot;
use uuid::Uuid;

/// A request in flight, paired with its reply channel.
pub(crate) struct BridgeEnvelope {
    pub(crate) id: Uuid,
    pub(crate) request: BridgeRequest,
    pub(crate) reply: oneshot::Sender<BridgeResponse>,
}

//! The network client seam.
//!
//! One `NetworkClient` instance owns one connection to the network. The
//! session registry is its only holder; no other component retains the
//! handle past a call.

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tokio::sync::mpsc,
};

use crate::{device::DeviceIdentity, events::NetworkEvent};

/// Callback invoked for every event the client emits. Handlers run on the
/// client's protocol task and must not block.
pub type NetworkEventHandler = Arc<dyn Fn(NetworkEvent) + Send + Sync>;

/// Acknowledgement for an accepted outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of one existence probe query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The digit string that was queried.
    pub query: String,
    /// Canonical address the network reports for the query. Only meaningful
    /// when `registered` is true; may differ from the query (normalized
    /// device-linking suffix, reassigned ninth digit).
    pub jid: String,
    pub registered: bool,
}

/// Progress of a pairing attempt, streamed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PairingEvent {
    /// A fresh code to render; each code is valid for `timeout_secs`.
    Code { code: String, timeout_secs: u32 },
    Success,
    Timeout,
    Error { message: String },
}

impl PairingEvent {
    /// Whether this event ends the pairing stream.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PairingEvent::Code { .. })
    }
}

/// One per-account connection to the messaging network.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Install the process-wide event callback for this connection. Replaces
    /// any previously installed handler.
    fn set_event_handler(&self, handler: NetworkEventHandler);

    /// Open the connection and block until the network confirms it.
    async fn connect(&self) -> Result<()>;

    /// Close the connection.
    async fn disconnect(&self) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Whether the client has bound device credentials (paired), regardless
    /// of current connection state.
    fn is_authenticated(&self) -> bool;

    /// Send a text message to a canonical address.
    async fn send_text(&self, to: &str, body: &str) -> Result<SendReceipt>;

    /// Ask the network which of the given digit strings are registered
    /// accounts.
    async fn is_on_network(&self, queries: &[String]) -> Result<Vec<ProbeResult>>;

    /// Invalidate the bound credentials server-side.
    async fn logout(&self) -> Result<()>;

    /// Obtain the pairing event stream for an unauthenticated client. Must
    /// be called before the connection attempt that drives pairing.
    async fn qr_channel(&self) -> Result<mpsc::Receiver<PairingEvent>>;

    /// Request a phone-number link code instead of a QR code.
    async fn pair_phone(&self, phone: &str) -> Result<String>;
}

/// Builds a client bound to a device identity. Implemented by the embedding
/// binary over the real protocol library.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        handle: &str,
        identity: &DeviceIdentity,
    ) -> Result<Arc<dyn NetworkClient>>;
}

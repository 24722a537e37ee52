//! Typed events emitted by a network client.
//!
//! Every raw protocol event is classified into one of a closed set of
//! variants, each carrying a typed payload. The closed enum gives the event
//! router compile-time exhaustiveness on the variant switch while keeping
//! handler registration open (many handlers per kind).

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// Event classification used for handler registration and webhook filtering.
///
/// `Test` never originates from a client; it marks synthetic envelopes sent
/// by the webhook connectivity probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Connected,
    Disconnected,
    Qr,
    LoggedOut,
    Test,
}

impl EventKind {
    /// The kinds a network client can emit, in no particular order.
    pub const NETWORK: [EventKind; 5] = [
        EventKind::Message,
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Qr,
        EventKind::LoggedOut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Message => "message",
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::Qr => "qr",
            EventKind::LoggedOut => "logged_out",
            EventKind::Test => "test",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event raised by a network client for the session that owns it.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    Message(MessageEvent),
    Connected(ConnectedEvent),
    Disconnected(DisconnectedEvent),
    Qr(QrEvent),
    LoggedOut(LoggedOutEvent),
}

impl NetworkEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            NetworkEvent::Message(_) => EventKind::Message,
            NetworkEvent::Connected(_) => EventKind::Connected,
            NetworkEvent::Disconnected(_) => EventKind::Disconnected,
            NetworkEvent::Qr(_) => EventKind::Qr,
            NetworkEvent::LoggedOut(_) => EventKind::LoggedOut,
        }
    }

    /// The event-kind-specific payload carried in a webhook envelope.
    pub fn payload_json(&self) -> Value {
        let payload = match self {
            NetworkEvent::Message(e) => serde_json::to_value(e),
            NetworkEvent::Connected(e) => serde_json::to_value(e),
            NetworkEvent::Disconnected(e) => serde_json::to_value(e),
            NetworkEvent::Qr(e) => serde_json::to_value(e),
            NetworkEvent::LoggedOut(e) => serde_json::to_value(e),
        };
        payload.unwrap_or(Value::Null)
    }
}

/// An inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: String,
    /// Chat the message arrived in (equals `sender` for direct chats).
    pub chat: String,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

/// The session authenticated and came online.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedEvent {
    /// Network address the session is bound to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jid: Option<String>,
}

/// The connection dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisconnectedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A pairing code became available for an unauthenticated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrEvent {
    pub code: String,
}

/// The network invalidated the session's credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedOutEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

//! Webhook configuration and delivery health.

use std::collections::HashSet;

use {
    chrono::{DateTime, Utc},
    secrecy::SecretString,
    serde::{Deserialize, Serialize},
};

use wamux_adapter::EventKind;

/// The single external delivery target for this process.
///
/// Replaced atomically by `configure`; readers always observe a consistent
/// url/events/secret triple.
#[derive(Default, Deserialize)]
pub struct WebhookConfig {
    /// Delivery disabled while unset.
    pub url: Option<String>,

    /// Kinds to deliver. An empty set enables every kind.
    #[serde(default)]
    pub events: HashSet<EventKind>,

    /// Shared secret for the request signature header.
    #[serde(default)]
    pub secret: Option<SecretString>,
}

impl WebhookConfig {
    /// Whether the enabled-set admits this kind.
    pub fn accepts(&self, kind: EventKind) -> bool {
        self.events.is_empty() || self.events.contains(&kind)
    }
}

/// Observational state of the delivery target, updated after every attempt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_delivery: Option<DateTime<Utc>>,
}

/// Status snapshot for the configuration surface.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookStatus {
    pub url: Option<String>,
    pub events: Vec<EventKind>,
    pub health: WebhookHealth,
}

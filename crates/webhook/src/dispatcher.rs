//! Webhook delivery.
//!
//! `dispatch_event` is fire-and-forget: it builds and signs the envelope
//! under a read lock on the configuration, then hands the POST to a detached
//! task so the event producer never blocks on delivery I/O. Outcomes are
//! only recorded in [`WebhookHealth`]; there is no retry.

use std::{
    collections::HashSet,
    sync::{Arc, RwLock},
    time::Duration,
};

use {
    chrono::{SecondsFormat, Utc},
    secrecy::{ExposeSecret, SecretString},
    serde::Serialize,
    serde_json::{Value, json},
    tracing::{debug, warn},
};

use {
    wamux_adapter::{EventKind, NetworkEvent},
    wamux_common::GatewayError,
};

use crate::{
    config::{WebhookConfig, WebhookHealth, WebhookStatus},
    router::EventRouter,
    signature,
};

/// User agent presented to the webhook endpoint.
pub const USER_AGENT: &str = concat!("wamux/", env!("CARGO_PKG_VERSION"));

/// Header carrying the event kind.
pub const EVENT_KIND_HEADER: &str = "X-WhatsApp-Event";

/// Header carrying the body signature when a secret is configured.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_IDLE_CONNECTIONS: usize = 4;

/// The structured record POSTed to the webhook target.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub user_id: String,
    pub event_type: EventKind,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub data: Value,
}

impl EventEnvelope {
    pub fn new(handle: &str, kind: EventKind, data: Value) -> Self {
        Self {
            user_id: handle.to_string(),
            event_type: kind,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            data,
        }
    }
}

/// Delivers event envelopes to the single configured external endpoint.
pub struct WebhookDispatcher {
    config: RwLock<WebhookConfig>,
    health: Arc<RwLock<WebhookHealth>>,
    http: reqwest::Client,
}

impl WebhookDispatcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DELIVERY_TIMEOUT)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS)
            .build()
            .expect("webhook HTTP client construction");
        Self {
            config: RwLock::new(WebhookConfig::default()),
            health: Arc::new(RwLock::new(WebhookHealth::default())),
            http,
        }
    }

    /// Replace the target URL, enabled kinds, and secret atomically, then
    /// run one synchronous `test` delivery against the new target.
    ///
    /// A probe failure is reported as an error but the configuration stays
    /// applied; callers can inspect [`WebhookDispatcher::status`] and decide
    /// whether to reconfigure.
    pub async fn configure(
        &self,
        url: Option<String>,
        events: HashSet<EventKind>,
        secret: Option<SecretString>,
    ) -> Result<(), GatewayError> {
        let has_url = url.is_some();
        {
            let mut config = self.config.write().unwrap();
            *config = WebhookConfig {
                url,
                events,
                secret,
            };
        }
        if !has_url {
            // Clearing the target needs no reachability check.
            return Ok(());
        }
        self.send_test().await
    }

    /// Send a synthetic `test` envelope to the configured target and record
    /// the outcome in health. Bypasses the enabled-kinds filter.
    pub async fn send_test(&self) -> Result<(), GatewayError> {
        let (url, secret) = {
            let config = self.config.read().unwrap();
            match config.url.clone() {
                Some(url) => (url, config.secret.as_ref().map(clone_secret)),
                None => {
                    return Err(GatewayError::ConfigurationProbeFailed(
                        "no webhook URL configured".into(),
                    ));
                }
            }
        };

        let envelope = EventEnvelope::new(
            "",
            EventKind::Test,
            json!({ "message": "webhook test delivery" }),
        );
        let Some((body, sig)) = serialize_and_sign(&envelope, secret.as_ref()) else {
            return Err(GatewayError::ConfigurationProbeFailed(
                "failed to serialize test envelope".into(),
            ));
        };

        let outcome = post_envelope(&self.http, &url, EventKind::Test, body, sig).await;
        record_outcome(&self.health, &outcome);
        outcome.map_err(GatewayError::ConfigurationProbeFailed)
    }

    /// Enqueue one delivery for an event. Returns immediately; a no-op when
    /// no URL is configured or the kind is filtered out. The attempt's
    /// outcome is only observable through [`WebhookDispatcher::status`].
    pub fn dispatch_event(&self, handle: &str, kind: EventKind, data: Value) {
        let (url, secret) = {
            let config = self.config.read().unwrap();
            let Some(url) = config.url.clone() else {
                return;
            };
            if !config.accepts(kind) {
                debug!(account_id = handle, kind = %kind, "event kind not enabled, skipping webhook");
                return;
            }
            (url, config.secret.as_ref().map(clone_secret))
        };

        let envelope = EventEnvelope::new(handle, kind, data);
        let Some((body, sig)) = serialize_and_sign(&envelope, secret.as_ref()) else {
            warn!(account_id = handle, kind = %kind, "failed to serialize webhook envelope");
            return;
        };

        let http = self.http.clone();
        let health = Arc::clone(&self.health);
        tokio::spawn(async move {
            let outcome = post_envelope(&http, &url, kind, body, sig).await;
            if let Err(ref error) = outcome {
                warn!(kind = %kind, error = %error, "webhook delivery failed");
            }
            record_outcome(&health, &outcome);
        });
    }

    pub fn status(&self) -> WebhookStatus {
        let config = self.config.read().unwrap();
        let health = self.health.read().unwrap();
        let mut events: Vec<EventKind> = config.events.iter().copied().collect();
        events.sort_by_key(|kind| kind.as_str());
        WebhookStatus {
            url: config.url.clone(),
            events,
            health: health.clone(),
        }
    }
}

impl Default for WebhookDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Register a router handler forwarding every network event to the
/// dispatcher.
pub fn forward_to_webhook(router: &EventRouter, dispatcher: &Arc<WebhookDispatcher>) {
    let dispatcher = Arc::clone(dispatcher);
    router.register_all(Arc::new(move |handle, event: &NetworkEvent| {
        dispatcher.dispatch_event(handle, event.kind(), event.payload_json());
    }));
}

fn clone_secret(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().clone())
}

fn serialize_and_sign(
    envelope: &EventEnvelope,
    secret: Option<&SecretString>,
) -> Option<(Vec<u8>, Option<String>)> {
    let body = serde_json::to_vec(envelope).ok()?;
    let sig = secret.map(|s| signature::sign(s.expose_secret(), &body));
    Some((body, sig))
}

async fn post_envelope(
    http: &reqwest::Client,
    url: &str,
    kind: EventKind,
    body: Vec<u8>,
    sig: Option<String>,
) -> Result<(), String> {
    let mut request = http
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .header(EVENT_KIND_HEADER, kind.as_str());
    if let Some(sig) = sig {
        request = request.header(SIGNATURE_HEADER, sig);
    }

    match request.body(body).send().await {
        Ok(response) if response.status().is_success() => Ok(()),
        Ok(response) => Err(format!("webhook endpoint returned {}", response.status())),
        Err(e) => Err(e.to_string()),
    }
}

fn record_outcome(health: &Arc<RwLock<WebhookHealth>>, outcome: &Result<(), String>) {
    let mut health = health.write().unwrap();
    match outcome {
        Ok(()) => {
            health.connected = true;
            health.last_error = None;
            health.last_delivery = Some(Utc::now());
        }
        Err(error) => {
            health.connected = false;
            health.last_error = Some(error.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn kinds(kinds: &[EventKind]) -> HashSet<EventKind> {
        kinds.iter().copied().collect()
    }

    async fn settle() {
        // Detached delivery tasks race the assertions; give them a beat.
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn configure_probes_with_a_test_envelope() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "test")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "event_type": "test",
            })))
            .with_status(200)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new();
        dispatcher
            .configure(Some(format!("{}/hook", server.url())), HashSet::new(), None)
            .await
            .unwrap();

        probe.assert_async().await;
        let status = dispatcher.status();
        assert!(status.health.connected);
        assert!(status.health.last_delivery.is_some());
    }

    #[tokio::test]
    async fn probe_failure_still_applies_the_configuration() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("POST", "/hook")
            .with_status(503)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new();
        let url = format!("{}/hook", server.url());
        let result = dispatcher
            .configure(Some(url.clone()), HashSet::new(), None)
            .await;

        assert!(matches!(
            result,
            Err(GatewayError::ConfigurationProbeFailed(_))
        ));
        probe.assert_async().await;

        // The failed probe must not roll the target back.
        let status = dispatcher.status();
        assert_eq!(status.url, Some(url));
        assert!(!status.health.connected);
        assert!(status.health.last_error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn filtered_kind_issues_no_request() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "test")
            .with_status(200)
            .create_async()
            .await;
        let message = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "message")
            .expect(0)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new();
        dispatcher
            .configure(
                Some(format!("{}/hook", server.url())),
                kinds(&[EventKind::Connected]),
                None,
            )
            .await
            .unwrap();

        dispatcher.dispatch_event("alice", EventKind::Message, json!({"body": "hi"}));
        settle().await;

        probe.assert_async().await;
        message.assert_async().await;
    }

    #[tokio::test]
    async fn enabled_kind_delivers_the_envelope() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "test")
            .with_status(200)
            .create_async()
            .await;
        let message = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "message")
            .match_body(Matcher::AllOf(vec![
                Matcher::PartialJson(json!({"user_id": "alice", "event_type": "message"})),
                Matcher::PartialJson(json!({"data": {"body": "hi"}})),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new();
        dispatcher
            .configure(
                Some(format!("{}/hook", server.url())),
                kinds(&[EventKind::Message]),
                None,
            )
            .await
            .unwrap();

        dispatcher.dispatch_event("alice", EventKind::Message, json!({"body": "hi"}));
        settle().await;
        message.assert_async().await;
    }

    #[tokio::test]
    async fn secret_adds_a_verifiable_signature() {
        let mut server = mockito::Server::new_async().await;
        let probe = server
            .mock("POST", "/hook")
            .match_header(
                SIGNATURE_HEADER,
                Matcher::Regex("^sha256=[0-9a-f]{64}$".into()),
            )
            .with_status(200)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new();
        dispatcher
            .configure(
                Some(format!("{}/hook", server.url())),
                HashSet::new(),
                Some(SecretString::new("hunter2".into())),
            )
            .await
            .unwrap();

        probe.assert_async().await;
    }

    #[tokio::test]
    async fn failed_delivery_flips_health_to_disconnected() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "test")
            .with_status(200)
            .create_async()
            .await;
        let _failing = server
            .mock("POST", "/hook")
            .match_header(EVENT_KIND_HEADER, "disconnected")
            .with_status(500)
            .create_async()
            .await;

        let dispatcher = WebhookDispatcher::new();
        dispatcher
            .configure(Some(format!("{}/hook", server.url())), HashSet::new(), None)
            .await
            .unwrap();
        assert!(dispatcher.status().health.connected);

        dispatcher.dispatch_event("alice", EventKind::Disconnected, json!({}));
        settle().await;

        let health = dispatcher.status().health;
        assert!(!health.connected);
        assert!(health.last_error.unwrap().contains("500"));
    }

    #[tokio::test]
    async fn unconfigured_dispatch_is_a_noop() {
        let dispatcher = WebhookDispatcher::new();
        dispatcher.dispatch_event("alice", EventKind::Message, json!({}));
        settle().await;

        let status = dispatcher.status();
        assert!(status.url.is_none());
        assert!(!status.health.connected);
        assert!(status.health.last_error.is_none());

        let result = dispatcher.send_test().await;
        assert!(matches!(
            result,
            Err(GatewayError::ConfigurationProbeFailed(_))
        ));
    }
}

//! Event routing and webhook delivery.
//!
//! Network events flow from the session registry's per-client callback into
//! the [`EventRouter`], which fans each event out to the handlers registered
//! for its kind. The bundled handler forwards to the [`WebhookDispatcher`],
//! which serializes an envelope, signs it, and POSTs it to the configured
//! endpoint on a detached task.

pub mod config;
pub mod dispatcher;
pub mod router;
pub mod signature;

pub use {
    config::{WebhookConfig, WebhookHealth, WebhookStatus},
    dispatcher::{EventEnvelope, WebhookDispatcher, forward_to_webhook},
    router::{EventHandlerFn, EventRouter},
};

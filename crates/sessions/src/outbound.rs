//! The send path.
//!
//! Every send accepts a raw "to" field and routes it through the recipient
//! resolver before it reaches the session's client. The resolver's
//! existence probe runs on the same account's live connection.

use std::sync::Arc;

use {async_trait::async_trait, tracing::debug};

use {
    wamux_adapter::{ProbeResult, SendReceipt},
    wamux_common::GatewayError,
    wamux_resolver::{ExistenceProbe, RecipientResolver},
};

use crate::registry::SessionRegistry;

#[async_trait]
impl ExistenceProbe for SessionRegistry {
    async fn is_on_network(
        &self,
        handle: &str,
        queries: &[String],
    ) -> anyhow::Result<Vec<ProbeResult>> {
        let client = self.client(handle).map_err(anyhow::Error::new)?;
        client.is_on_network(queries).await
    }
}

/// Outbound message sender over the session registry.
pub struct Outbound {
    registry: Arc<SessionRegistry>,
    resolver: RecipientResolver,
}

impl Outbound {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        let probe = Arc::clone(&registry) as Arc<dyn ExistenceProbe>;
        Self {
            registry,
            resolver: RecipientResolver::new(probe),
        }
    }

    /// Resolve the recipient and send a text message on the handle's
    /// session.
    pub async fn send_text(
        &self,
        handle: &str,
        to: &str,
        body: &str,
    ) -> Result<SendReceipt, GatewayError> {
        let resolution = self.resolver.resolve(handle, to).await?;
        if !resolution.is_verified() {
            debug!(
                account_id = handle,
                to = %resolution.address,
                "sending to an unverified recipient"
            );
        }

        let client = self.registry.client(handle)?;
        let receipt = client
            .send_text(&resolution.address, body)
            .await
            .map_err(|e| GatewayError::upstream(format!("{e:#}")))?;
        self.registry.mark_active(handle);
        debug!(
            account_id = handle,
            message_id = %receipt.message_id,
            "message sent"
        );
        Ok(receipt)
    }
}

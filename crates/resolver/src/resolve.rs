//! Recipient resolution.
//!
//! Combines structural validation, phone normalization, and the live
//! existence probe. Resolution never blocks a send on the probe: transport
//! failures and all-miss outcomes degrade to a best-effort canonical form
//! marked [`Verification::Unverified`].

use std::sync::Arc;

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::Serialize,
    tracing::{debug, warn},
};

use {wamux_adapter::ProbeResult, wamux_common::GatewayError};

use crate::{
    address::Address,
    phone::{self, MIN_PHONE_DIGITS},
};

/// Live existence check against the network, bound to the account handle
/// whose connection performs the query. Implemented by the session registry.
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn is_on_network(&self, handle: &str, queries: &[String]) -> Result<Vec<ProbeResult>>;
}

/// How much confidence resolution has in the returned address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// The network confirmed the address exists.
    Confirmed,
    /// Structurally valid special-domain address; no existence check
    /// applies.
    Structural,
    /// No candidate could be confirmed; best-effort canonical form.
    Unverified,
}

/// A resolved recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub address: String,
    pub verification: Verification,
}

impl Resolution {
    pub fn is_verified(&self) -> bool {
        self.verification != Verification::Unverified
    }
}

/// Turns a raw "to" field into a verified canonical address.
pub struct RecipientResolver {
    probe: Arc<dyn ExistenceProbe>,
}

impl RecipientResolver {
    pub fn new(probe: Arc<dyn ExistenceProbe>) -> Self {
        Self { probe }
    }

    /// Resolve a raw recipient for a send on the given account's session.
    pub async fn resolve(&self, handle: &str, raw: &str) -> Result<Resolution, GatewayError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(GatewayError::InvalidAddress("empty recipient".into()));
        }

        // Already-suffixed addresses bypass the phone heuristics entirely.
        if raw.contains('@') {
            let address = Address::parse(raw)?;
            return Ok(Resolution {
                address: address.to_string(),
                verification: Verification::Structural,
            });
        }

        let digits = phone::strip_separators(raw);
        if !phone::is_digits(&digits) {
            return Err(GatewayError::InvalidAddress(format!(
                "{raw:?} is neither a phone number nor a suffixed network address"
            )));
        }
        if digits.len() < MIN_PHONE_DIGITS {
            return Err(GatewayError::InvalidAddress(format!(
                "{raw:?} has fewer than {MIN_PHONE_DIGITS} digits"
            )));
        }

        let primary = phone::primary_candidate(&digits);
        match self.probe_candidate(handle, &primary).await {
            Ok(Some(jid)) => {
                return Ok(Resolution {
                    address: jid,
                    verification: Verification::Confirmed,
                });
            }
            Ok(None) => {}
            Err(e) => {
                warn!(account_id = handle, error = %e, "existence probe unavailable, using unverified canonical form");
                return Ok(unverified(&primary));
            }
        }

        for alternate in phone::alternate_candidates(&primary) {
            match self.probe_candidate(handle, &alternate).await {
                Ok(Some(jid)) => {
                    debug!(account_id = handle, candidate = %alternate, "alternate phone hypothesis confirmed");
                    return Ok(Resolution {
                        address: jid,
                        verification: Verification::Confirmed,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(account_id = handle, error = %e, "existence probe unavailable, using unverified canonical form");
                    return Ok(unverified(&primary));
                }
            }
        }

        // Deliberate policy: an unreliable existence check never blocks a
        // send. The marker makes the degradation observable to callers.
        warn!(
            account_id = handle,
            candidate = %primary,
            "recipient not confirmed on the network, using unverified canonical form"
        );
        Ok(unverified(&primary))
    }

    async fn probe_candidate(&self, handle: &str, candidate: &str) -> Result<Option<String>> {
        let queries = vec![candidate.to_string()];
        let results = self.probe.is_on_network(handle, &queries).await?;
        Ok(results
            .into_iter()
            .find(|result| result.registered)
            .map(|result| result.jid))
    }
}

fn unverified(primary: &str) -> Resolution {
    Resolution {
        address: Address::phone(primary).to_string(),
        verification: Verification::Unverified,
    }
}

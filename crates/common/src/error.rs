//! Error taxonomy for the gateway surface.
//!
//! Callers use the variant to decide whether to retry, re-authenticate, or
//! fix the request: `NotFound` and `AlreadyAuthenticated` are tenant/session
//! problems, `InvalidAddress` is malformed input, and the rest are upstream
//! or infrastructure failures.

use thiserror::Error;

/// Structured error returned by session lifecycle, send, and webhook
/// configuration operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No session is registered for the account handle.
    #[error("no session for account {0}")]
    NotFound(String),

    /// The session already has bound device credentials; pairing again
    /// requires a reset first.
    #[error("account {0} is already paired to a device")]
    AlreadyAuthenticated(String),

    /// The bounded wait for connection confirmation elapsed. The underlying
    /// connection may still complete; callers must not assume the session is
    /// disconnected.
    #[error("connect timed out after {0}s")]
    ConnectionTimeout(u64),

    /// The recipient is neither a plausible phone number nor a validly
    /// structured network address.
    #[error("invalid recipient address: {0}")]
    InvalidAddress(String),

    /// A call into the network client failed.
    #[error("upstream client error: {0}")]
    UpstreamUnavailable(String),

    /// The webhook connectivity test failed. The new configuration is still
    /// applied; inspect webhook health for details.
    #[error("webhook connectivity probe failed: {0}")]
    ConfigurationProbeFailed(String),

    /// The device identity store failed.
    #[error("device store error: {0}")]
    Storage(String),
}

impl GatewayError {
    /// Wrap a failure from the network client seam.
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }

    /// Wrap a failure from the device store seam.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

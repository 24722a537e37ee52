//! Request signing for webhook deliveries.
//!
//! Receivers verify the `X-Hub-Signature` header to confirm the request
//! originated from this process with the shared secret.

use {
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Compute the signature header value for a serialized envelope:
/// `sha256=<hex HMAC-SHA256 of the body keyed by the secret>`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a signature header produced by [`sign`]. Comparison of the MAC
/// bytes is constant-time.
pub fn verify(secret: &str, body: &[u8], header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

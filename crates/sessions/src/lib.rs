//! Session lifecycle management.
//!
//! The [`SessionRegistry`] owns one network client per account handle:
//! creation against persisted device identities, connection with bounded
//! waits, pairing, logout/reset/delete, startup reload, and idle eviction.
//! [`Outbound`] is the send path, routing raw recipients through the
//! recipient resolver before they reach a client.

pub mod config;
pub mod eviction;
pub mod outbound;
pub mod pairing;
pub mod registry;

#[cfg(test)]
pub(crate) mod testutil;

pub use {
    config::SessionConfig,
    outbound::Outbound,
    registry::{SessionRegistry, SessionSnapshot},
};

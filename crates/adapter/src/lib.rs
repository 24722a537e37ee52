//! Seams to the external collaborators of the wamux gateway.
//!
//! The WhatsApp protocol client and the device credential store are consumed,
//! not built: this crate defines the traits the rest of the workspace codes
//! against (`NetworkClient`, `ClientFactory`, `DeviceStore`), the typed event
//! set a client emits, and an in-memory device store for tests and ephemeral
//! deployments.

pub mod client;
pub mod device;
pub mod events;

pub use {
    client::{
        ClientFactory, NetworkClient, NetworkEventHandler, PairingEvent, ProbeResult, SendReceipt,
    },
    device::{DeviceIdentity, DeviceStore, MemoryDeviceStore},
    events::{EventKind, NetworkEvent},
};

//! Persisted device identities.
//!
//! A device identity is the credential material a session binds to on
//! creation. Storage is external; this module defines the key-value seam
//! (account handle → identity) plus an in-memory implementation for tests
//! and ephemeral deployments.

use std::{
    collections::HashMap,
    sync::RwLock,
};

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

/// Credential material binding a session to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Opaque identifier of the credential record.
    pub device_id: String,
    /// Network address the credentials are registered to; `None` until the
    /// device completes pairing.
    pub jid: Option<String>,
}

impl DeviceIdentity {
    /// Allocate a fresh, unpaired identity.
    pub fn fresh() -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            jid: None,
        }
    }

    /// A persisted identity with no device id is corrupt and gets replaced.
    pub fn is_valid(&self) -> bool {
        !self.device_id.is_empty()
    }
}

/// Durable mapping from account handle to device identity.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, handle: &str) -> Result<Option<DeviceIdentity>>;

    async fn put(&self, handle: &str, identity: &DeviceIdentity) -> Result<()>;

    async fn delete(&self, handle: &str) -> Result<()>;

    /// Enumerate every persisted mapping, for startup reload.
    async fn list(&self) -> Result<Vec<(String, DeviceIdentity)>>;
}

/// In-memory device store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryDeviceStore {
    identities: RwLock<HashMap<String, DeviceIdentity>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, handle: &str) -> Result<Option<DeviceIdentity>> {
        let identities = self
            .identities
            .read()
            .map_err(|e| anyhow::anyhow!("lock error: {e}"))?;
        Ok(identities.get(handle).cloned())
    }

    async fn put(&self, handle: &str, identity: &DeviceIdentity) -> Result<()> {
        let mut identities = self
            .identities
            .write()
            .map_err(|e| anyhow::anyhow!("lock error: {e}"))?;
        identities.insert(handle.to_string(), identity.clone());
        Ok(())
    }

    async fn delete(&self, handle: &str) -> Result<()> {
        let mut identities = self
            .identities
            .write()
            .map_err(|e| anyhow::anyhow!("lock error: {e}"))?;
        identities.remove(handle);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, DeviceIdentity)>> {
        let identities = self
            .identities
            .read()
            .map_err(|e| anyhow::anyhow!("lock error: {e}"))?;
        Ok(identities
            .iter()
            .map(|(handle, identity)| (handle.clone(), identity.clone()))
            .collect())
    }
}

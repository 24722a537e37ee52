//! The session registry.
//!
//! One entry per account handle, protected by a single reader/writer lock.
//! Map bookkeeping and connection I/O are separate critical sections: every
//! operation clones the client handle out under the lock and performs
//! network calls without it, so lookups stay concurrent while a connect is
//! in flight. Per-handle connect attempts are serialized through a connect
//! gate owned by the entry.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use {
    chrono::{DateTime, Utc},
    serde::Serialize,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use {
    wamux_adapter::{
        ClientFactory, DeviceIdentity, DeviceStore, NetworkClient, NetworkEvent,
    },
    wamux_common::GatewayError,
    wamux_webhook::EventRouter,
};

use crate::config::SessionConfig;

pub(crate) struct SessionEntry {
    pub(crate) client: Arc<dyn NetworkClient>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_active: DateTime<Utc>,
    /// Serializes connection attempts for this handle so concurrent
    /// `connect` calls initiate at most one underlying attempt.
    pub(crate) connect_gate: Arc<Mutex<()>>,
}

impl SessionEntry {
    fn new(client: Arc<dyn NetworkClient>) -> Self {
        let now = Utc::now();
        Self {
            client,
            created_at: now,
            last_active: now,
            connect_gate: Arc::new(Mutex::new(())),
        }
    }
}

pub(crate) type SessionMap = Arc<RwLock<HashMap<String, SessionEntry>>>;

/// Point-in-time view of a session for the status surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub handle: String,
    pub connected: bool,
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Thread-safe map of account handle → session, owning creation,
/// connection, disconnection, deletion, and startup reload.
pub struct SessionRegistry {
    pub(crate) sessions: SessionMap,
    pub(crate) devices: Arc<dyn DeviceStore>,
    pub(crate) factory: Arc<dyn ClientFactory>,
    pub(crate) router: Arc<EventRouter>,
    pub(crate) config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        factory: Arc<dyn ClientFactory>,
        router: Arc<EventRouter>,
        config: SessionConfig,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            devices,
            factory,
            router,
            config,
        }
    }

    /// Create the session for a handle, or return the existing one.
    ///
    /// Looks up the persisted device identity, allocating and persisting a
    /// fresh one when it is missing or invalid, then binds a new client and
    /// registers the event callback.
    pub async fn create_session(&self, handle: &str) -> Result<SessionSnapshot, GatewayError> {
        if let Some(snapshot) = self.snapshot(handle) {
            return Ok(snapshot);
        }

        let identity = self.load_or_allocate_identity(handle).await?;
        let client = self
            .factory
            .create(handle, &identity)
            .await
            .map_err(GatewayError::upstream)?;
        self.install_event_handler(handle, &client);

        let mut sessions = self.sessions.write().unwrap();
        // A racing creator may have inserted while we were allocating; keep
        // the existing entry so both callers observe the same connection.
        let entry = sessions
            .entry(handle.to_string())
            .or_insert_with(|| SessionEntry::new(client));
        info!(account_id = handle, "session registered");
        Ok(make_snapshot(handle, entry))
    }

    /// Open the session's connection, waiting up to the configured timeout
    /// for confirmation. Success is idempotent for a connected session.
    ///
    /// On timeout the underlying connection is not guaranteed closed; the
    /// caller must not assume disconnection.
    pub async fn connect(&self, handle: &str) -> Result<(), GatewayError> {
        let (client, gate) = self.client_and_gate(handle)?;
        let _serialized = gate.lock().await;
        if client.is_connected() {
            return Ok(());
        }

        self.mark_active(handle);
        let timeout = self.config.connect_timeout();
        match tokio::time::timeout(timeout, client.connect()).await {
            Ok(Ok(())) => {
                self.mark_active(handle);
                info!(account_id = handle, "session connected");
                Ok(())
            }
            Ok(Err(e)) => Err(GatewayError::upstream(format!("{e:#}"))),
            Err(_) => Err(GatewayError::ConnectionTimeout(timeout.as_secs())),
        }
    }

    /// Close the session's connection. A no-op when not connected.
    pub async fn disconnect(&self, handle: &str) -> Result<(), GatewayError> {
        let client = self.client(handle)?;
        if client.is_connected() {
            if let Err(e) = client.disconnect().await {
                warn!(account_id = handle, error = %e, "disconnect failed");
            } else {
                info!(account_id = handle, "session disconnected");
            }
        }
        Ok(())
    }

    /// Close every connected session. Best-effort: per-session failures are
    /// logged, never returned.
    pub async fn disconnect_all(&self) {
        let clients: Vec<(String, Arc<dyn NetworkClient>)> = {
            let sessions = self.sessions.read().unwrap();
            sessions
                .iter()
                .map(|(handle, entry)| (handle.clone(), Arc::clone(&entry.client)))
                .collect()
        };
        for (handle, client) in clients {
            if !client.is_connected() {
                continue;
            }
            match client.disconnect().await {
                Ok(()) => debug!(account_id = %handle, "session disconnected"),
                Err(e) => warn!(account_id = %handle, error = %e, "disconnect failed"),
            }
        }
    }

    /// Invalidate the credentials server-side (best-effort), then remove the
    /// session and delete its persisted identity.
    pub async fn logout(&self, handle: &str) -> Result<(), GatewayError> {
        let client = self.client(handle)?;
        if client.is_connected() && client.is_authenticated() {
            if let Err(e) = client.logout().await {
                warn!(account_id = handle, error = %e, "server-side logout failed");
            }
        }
        self.remove_session(handle).await
    }

    /// Recover from a corrupted credential without losing the handle's
    /// bookkeeping: disconnect, replace the persisted identity with a fresh
    /// one, and bind a new client in place. The session stays registered but
    /// unauthenticated.
    pub async fn reset_session(&self, handle: &str) -> Result<(), GatewayError> {
        let client = self.client(handle)?;
        if client.is_connected() {
            if let Err(e) = client.disconnect().await {
                warn!(account_id = handle, error = %e, "disconnect before reset failed");
            }
        }

        self.devices
            .delete(handle)
            .await
            .map_err(GatewayError::storage)?;
        let fresh = DeviceIdentity::fresh();
        self.devices
            .put(handle, &fresh)
            .await
            .map_err(GatewayError::storage)?;

        let replacement = self
            .factory
            .create(handle, &fresh)
            .await
            .map_err(GatewayError::upstream)?;
        self.install_event_handler(handle, &replacement);

        let mut sessions = self.sessions.write().unwrap();
        match sessions.get_mut(handle) {
            Some(entry) => {
                entry.client = replacement;
                entry.last_active = Utc::now();
                info!(account_id = handle, "session reset with a fresh device identity");
                Ok(())
            }
            // The session was deleted while we rebuilt the identity.
            None => Err(GatewayError::NotFound(handle.to_string())),
        }
    }

    /// Disconnect, remove the session, and delete its persisted identity.
    pub async fn delete_session(&self, handle: &str) -> Result<(), GatewayError> {
        self.remove_session(handle).await
    }

    /// Recreate sessions for every persisted device identity and attempt to
    /// connect each in the background. Invalid identities are discarded and
    /// their mapping removed; a failure on one mapping never blocks the
    /// others.
    pub async fn restore_persisted_sessions(self: &Arc<Self>) -> Result<usize, GatewayError> {
        let mappings = self.devices.list().await.map_err(GatewayError::storage)?;
        let mut restored = 0;
        for (handle, identity) in mappings {
            if !identity.is_valid() {
                warn!(account_id = %handle, "discarding invalid persisted device identity");
                if let Err(e) = self.devices.delete(&handle).await {
                    warn!(account_id = %handle, error = %e, "failed to remove invalid identity");
                }
                continue;
            }
            if let Err(e) = self.create_session(&handle).await {
                warn!(account_id = %handle, error = %e, "failed to restore session");
                continue;
            }
            restored += 1;

            // Each startup connect runs independently with its own timeout.
            let registry = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = registry.connect(&handle).await {
                    warn!(account_id = %handle, error = %e, "startup connect failed");
                }
            });
        }
        info!(restored, "restored persisted sessions");
        Ok(restored)
    }

    pub fn snapshot(&self, handle: &str) -> Option<SessionSnapshot> {
        let sessions = self.sessions.read().unwrap();
        sessions.get(handle).map(|entry| make_snapshot(handle, entry))
    }

    pub fn snapshots(&self) -> Vec<SessionSnapshot> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .iter()
            .map(|(handle, entry)| make_snapshot(handle, entry))
            .collect()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.sessions.read().unwrap().contains_key(handle)
    }

    /// The client for a handle. Crate-internal: the connection handle's
    /// lifetime is scoped to its session and must not escape a call.
    pub(crate) fn client(&self, handle: &str) -> Result<Arc<dyn NetworkClient>, GatewayError> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(handle)
            .map(|entry| Arc::clone(&entry.client))
            .ok_or_else(|| GatewayError::NotFound(handle.to_string()))
    }

    pub(crate) fn mark_active(&self, handle: &str) {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(entry) = sessions.get_mut(handle) {
            entry.last_active = Utc::now();
        }
    }

    fn client_and_gate(
        &self,
        handle: &str,
    ) -> Result<(Arc<dyn NetworkClient>, Arc<Mutex<()>>), GatewayError> {
        let sessions = self.sessions.read().unwrap();
        sessions
            .get(handle)
            .map(|entry| (Arc::clone(&entry.client), Arc::clone(&entry.connect_gate)))
            .ok_or_else(|| GatewayError::NotFound(handle.to_string()))
    }

    async fn load_or_allocate_identity(
        &self,
        handle: &str,
    ) -> Result<DeviceIdentity, GatewayError> {
        let stored = self
            .devices
            .get(handle)
            .await
            .map_err(GatewayError::storage)?;
        match stored {
            Some(identity) if identity.is_valid() => Ok(identity),
            stored => {
                if stored.is_some() {
                    warn!(
                        account_id = handle,
                        "persisted device identity is invalid, allocating a fresh one"
                    );
                }
                let fresh = DeviceIdentity::fresh();
                self.devices
                    .put(handle, &fresh)
                    .await
                    .map_err(GatewayError::storage)?;
                Ok(fresh)
            }
        }
    }

    /// Tag every client event with the owning handle, refresh the session's
    /// activity bookkeeping, and forward to the event router.
    fn install_event_handler(&self, handle: &str, client: &Arc<dyn NetworkClient>) {
        let sessions = Arc::clone(&self.sessions);
        let router = Arc::clone(&self.router);
        let handle = handle.to_string();
        client.set_event_handler(Arc::new(move |event| {
            note_event(&sessions, &handle, &event);
            router.dispatch(&handle, &event);
        }));
    }

    async fn remove_session(&self, handle: &str) -> Result<(), GatewayError> {
        let entry = {
            self.sessions
                .write()
                .unwrap()
                .remove(handle)
                .ok_or_else(|| GatewayError::NotFound(handle.to_string()))?
        };
        if entry.client.is_connected() {
            if let Err(e) = entry.client.disconnect().await {
                warn!(account_id = handle, error = %e, "disconnect during removal failed");
            }
        }
        self.devices
            .delete(handle)
            .await
            .map_err(GatewayError::storage)?;
        info!(account_id = handle, "session removed");
        Ok(())
    }
}

fn make_snapshot(handle: &str, entry: &SessionEntry) -> SessionSnapshot {
    SessionSnapshot {
        handle: handle.to_string(),
        connected: entry.client.is_connected(),
        authenticated: entry.client.is_authenticated(),
        created_at: entry.created_at,
        last_active: entry.last_active,
    }
}

fn note_event(sessions: &SessionMap, handle: &str, event: &NetworkEvent) {
    {
        let mut sessions = sessions.write().unwrap();
        if let Some(entry) = sessions.get_mut(handle) {
            entry.last_active = Utc::now();
        }
    }
    match event {
        NetworkEvent::Disconnected(e) => {
            debug!(account_id = handle, reason = ?e.reason, "client reported disconnect");
        }
        NetworkEvent::LoggedOut(_) => {
            info!(account_id = handle, "client was logged out by the network");
        }
        _ => {}
    }
}

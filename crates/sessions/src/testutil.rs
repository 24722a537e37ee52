//! Shared fakes for the crate's tests.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    anyhow::Result,
    async_trait::async_trait,
    chrono::Utc,
    tokio::sync::mpsc,
};

use {
    wamux_adapter::{
        ClientFactory, DeviceIdentity, DeviceStore, MemoryDeviceStore, NetworkClient,
        NetworkEvent, NetworkEventHandler, PairingEvent, ProbeResult, SendReceipt,
    },
    wamux_webhook::EventRouter,
};

use crate::{config::SessionConfig, registry::SessionRegistry};

/// Scriptable in-process stand-in for a network client.
#[derive(Default)]
pub(crate) struct FakeClient {
    pub(crate) connected: AtomicBool,
    pub(crate) authenticated: AtomicBool,
    pub(crate) connect_calls: AtomicUsize,
    pub(crate) disconnect_calls: AtomicUsize,
    pub(crate) logout_calls: AtomicUsize,
    /// Simulated connect latency.
    pub(crate) connect_delay: Option<Duration>,
    /// Number of connect attempts that fail before one succeeds.
    pub(crate) failing_connects: AtomicUsize,
    /// Events replayed by `qr_channel`.
    pub(crate) pairing_script: Mutex<Vec<PairingEvent>>,
    /// Keep the pairing stream open after the script (no terminal event).
    pub(crate) keep_qr_open: bool,
    qr_sender: Mutex<Option<mpsc::Sender<PairingEvent>>>,
    /// Digit string → canonical jid for the existence probe.
    pub(crate) registered_numbers: Mutex<HashMap<String, String>>,
    pub(crate) last_send: Mutex<Option<(String, String)>>,
    handler: Mutex<Option<NetworkEventHandler>>,
}

impl FakeClient {
    /// Invoke the installed event callback the way a protocol task would.
    pub(crate) fn emit(&self, event: NetworkEvent) {
        let handler = self.handler.lock().unwrap().clone();
        if let Some(handler) = handler {
            handler(event);
        }
    }
}

#[async_trait]
impl NetworkClient for FakeClient {
    fn set_event_handler(&self, handler: NetworkEventHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }

    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            anyhow::bail!("connect refused");
        }
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    async fn send_text(&self, to: &str, body: &str) -> Result<SendReceipt> {
        *self.last_send.lock().unwrap() = Some((to.to_string(), body.to_string()));
        Ok(SendReceipt {
            message_id: "3EB0C431".into(),
            timestamp: Utc::now(),
        })
    }

    async fn is_on_network(&self, queries: &[String]) -> Result<Vec<ProbeResult>> {
        let registered = self.registered_numbers.lock().unwrap();
        Ok(queries
            .iter()
            .map(|query| match registered.get(query) {
                Some(jid) => ProbeResult {
                    query: query.clone(),
                    jid: jid.clone(),
                    registered: true,
                },
                None => ProbeResult {
                    query: query.clone(),
                    jid: String::new(),
                    registered: false,
                },
            })
            .collect())
    }

    async fn logout(&self) -> Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<PairingEvent>> {
        let script: Vec<PairingEvent> = self.pairing_script.lock().unwrap().drain(..).collect();
        let (tx, rx) = mpsc::channel(script.len().max(1));
        for event in script {
            let _ = tx.try_send(event);
        }
        if self.keep_qr_open {
            *self.qr_sender.lock().unwrap() = Some(tx);
        }
        // Otherwise the dropped sender closes the stream after the script.
        Ok(rx)
    }

    async fn pair_phone(&self, _phone: &str) -> Result<String> {
        Ok("WZYX-1234".into())
    }
}

type Customize = Box<dyn Fn(&mut FakeClient) + Send + Sync>;

/// Factory handing out `FakeClient`s, remembering every instance.
pub(crate) struct FakeFactory {
    created: Mutex<Vec<Arc<FakeClient>>>,
    customize: Customize,
}

impl FakeFactory {
    pub(crate) fn new() -> Self {
        Self::customized(|_| {})
    }

    pub(crate) fn customized(customize: impl Fn(&mut FakeClient) + Send + Sync + 'static) -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            customize: Box::new(customize),
        }
    }

    pub(crate) fn client(&self, index: usize) -> Arc<FakeClient> {
        Arc::clone(&self.created.lock().unwrap()[index])
    }

    pub(crate) fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl ClientFactory for FakeFactory {
    async fn create(
        &self,
        _handle: &str,
        _identity: &DeviceIdentity,
    ) -> Result<Arc<dyn NetworkClient>> {
        let mut client = FakeClient::default();
        (self.customize)(&mut client);
        let client = Arc::new(client);
        self.created.lock().unwrap().push(Arc::clone(&client));
        Ok(client)
    }
}

/// A registry wired to fakes, plus handles to observe them.
pub(crate) struct Harness {
    pub(crate) registry: Arc<SessionRegistry>,
    pub(crate) devices: Arc<MemoryDeviceStore>,
    pub(crate) factory: Arc<FakeFactory>,
    router_hits: Arc<AtomicUsize>,
}

impl Harness {
    /// Events that reached the router across all kinds.
    pub(crate) fn router_hits(&self) -> usize {
        self.router_hits.load(Ordering::SeqCst)
    }
}

pub(crate) fn harness() -> Harness {
    harness_with(FakeFactory::new(), SessionConfig::default())
}

pub(crate) fn harness_with(factory: FakeFactory, config: SessionConfig) -> Harness {
    let devices = Arc::new(MemoryDeviceStore::new());
    let factory = Arc::new(factory);
    let router = Arc::new(EventRouter::new());

    let router_hits = Arc::new(AtomicUsize::new(0));
    let hits = Arc::clone(&router_hits);
    router.register_all(Arc::new(move |_handle, _event| {
        hits.fetch_add(1, Ordering::SeqCst);
    }));

    let registry = Arc::new(SessionRegistry::new(
        Arc::clone(&devices) as Arc<dyn DeviceStore>,
        Arc::clone(&factory) as Arc<dyn ClientFactory>,
        router,
        config,
    ));
    Harness {
        registry,
        devices,
        factory,
        router_hits,
    }
}

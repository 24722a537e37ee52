//! Fan-out of network events to registered handlers.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use wamux_adapter::{EventKind, NetworkEvent};

/// A subscriber for one event kind. Invoked on the emitting client's task;
/// must not block (spawn delivery work instead).
pub type EventHandlerFn = Arc<dyn Fn(&str, &NetworkEvent) + Send + Sync>;

/// Classifies each raw event by kind and invokes every handler registered
/// for that kind. Registration order is not preserved across kinds and is
/// not part of the contract.
#[derive(Default)]
pub struct EventRouter {
    handlers: RwLock<HashMap<EventKind, Vec<EventHandlerFn>>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: EventKind, handler: EventHandlerFn) {
        let mut handlers = self.handlers.write().unwrap();
        handlers.entry(kind).or_default().push(handler);
    }

    /// Register one handler for every kind a network client can emit.
    pub fn register_all(&self, handler: EventHandlerFn) {
        for kind in EventKind::NETWORK {
            self.register(kind, Arc::clone(&handler));
        }
    }

    /// Route one event, tagged with the owning session's account handle.
    pub fn dispatch(&self, handle: &str, event: &NetworkEvent) {
        let matched: Vec<EventHandlerFn> = {
            let handlers = self.handlers.read().unwrap();
            handlers.get(&event.kind()).cloned().unwrap_or_default()
        };
        // Handlers run outside the lock so one can re-register another.
        for handler in matched {
            handler(handle, event);
        }
    }
}

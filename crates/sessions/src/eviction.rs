//! Idle session eviction.
//!
//! A periodic sweep drops sessions that are both disconnected and inactive
//! past the configured threshold. Eviction only releases the in-memory
//! entry; the persisted device identity stays, so a later request can
//! recreate the session and resume.

use std::sync::Arc;

use {
    chrono::Utc,
    tokio::task::JoinHandle,
    tracing::{debug, info},
};

use crate::registry::SessionRegistry;

impl SessionRegistry {
    /// Start the periodic idle sweep. The task runs until aborted.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.sweep_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh process
            // does not sweep before sessions had a chance to connect.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = registry.sweep_idle_sessions();
                if evicted > 0 {
                    debug!(evicted, "idle sweep finished");
                }
            }
        })
    }

    /// Run one sweep, returning how many sessions were evicted.
    pub fn sweep_idle_sessions(&self) -> usize {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.config.idle_timeout_secs as i64);
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        // Eligibility is decided under the lock: a session observed
        // connected here is never evicted, regardless of inactivity.
        sessions.retain(|handle, entry| {
            let keep = entry.client.is_connected() || entry.last_active > cutoff;
            if !keep {
                info!(account_id = %handle, last_active = %entry.last_active, "evicting idle session");
            }
            keep
        });
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wamux_adapter::DeviceStore;

    use crate::testutil::harness;

    fn age(h: &crate::testutil::Harness, handle: &str, hours: i64) {
        let mut sessions = h.registry.sessions.write().unwrap();
        sessions.get_mut(handle).unwrap().last_active = Utc::now() - chrono::Duration::hours(hours);
    }

    #[tokio::test]
    async fn evicts_disconnected_sessions_past_the_threshold() {
        let h = harness();
        h.registry.create_session("stale").await.unwrap();
        age(&h, "stale", 2);

        assert_eq!(h.registry.sweep_idle_sessions(), 1);
        assert!(!h.registry.contains("stale"));
    }

    #[tokio::test]
    async fn keeps_recently_active_sessions() {
        let h = harness();
        h.registry.create_session("fresh").await.unwrap();

        assert_eq!(h.registry.sweep_idle_sessions(), 0);
        assert!(h.registry.contains("fresh"));
    }

    #[tokio::test]
    async fn never_evicts_a_connected_session() {
        let h = harness();
        h.registry.create_session("busy").await.unwrap();
        h.registry.connect("busy").await.unwrap();
        age(&h, "busy", 48);

        assert_eq!(h.registry.sweep_idle_sessions(), 0);
        assert!(h.registry.contains("busy"));
    }

    #[tokio::test]
    async fn eviction_preserves_the_persisted_identity() {
        let h = harness();
        h.registry.create_session("stale").await.unwrap();
        age(&h, "stale", 2);

        h.registry.sweep_idle_sessions();
        assert!(!h.registry.contains("stale"));
        // The identity survives so the session can be recreated and resume.
        assert!(h.devices.get("stale").await.unwrap().is_some());

        h.registry.create_session("stale").await.unwrap();
        assert!(h.registry.contains("stale"));
    }
}

//! Session registry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for connection waits, pairing, and idle eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bounded wait for connection confirmation.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Connect attempts made while driving a pairing stream.
    #[serde(default = "default_pair_attempts")]
    pub pair_attempts: u32,

    /// Backoff between pairing connect attempts.
    #[serde(default = "default_pair_retry_secs")]
    pub pair_retry_secs: u64,

    /// Overall window before an unconsumed pairing attempt times out.
    #[serde(default = "default_pair_window_secs")]
    pub pair_window_secs: u64,

    /// Interval between idle-eviction sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Disconnected sessions idle longer than this are evicted.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_pair_attempts() -> u32 {
    3
}

fn default_pair_retry_secs() -> u64 {
    2
}

fn default_pair_window_secs() -> u64 {
    120
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_idle_timeout_secs() -> u64 {
    30 * 60
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            pair_attempts: default_pair_attempts(),
            pair_retry_secs: default_pair_retry_secs(),
            pair_window_secs: default_pair_window_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
        }
    }
}

impl SessionConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn pair_retry(&self) -> Duration {
        Duration::from_secs(self.pair_retry_secs)
    }

    pub fn pair_window(&self) -> Duration {
        Duration::from_secs(self.pair_window_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

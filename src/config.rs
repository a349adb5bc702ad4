//! Server and engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Engine-wide lock-wait timeout in seconds (default: 50)
    #[serde(default = "default_lock_wait_timeout_secs")]
    pub lock_wait_timeout_secs: u64,

    /// Tight lock-window timeout in seconds for contended single-row
    /// updates (default: 5)
    #[serde(default = "default_tight_window_secs")]
    pub tight_window_secs: u64,

    /// List page size (default: 10)
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_lock_wait_timeout_secs() -> u64 {
    50
}

fn default_tight_window_secs() -> u64 {
    5
}

fn default_per_page() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            lock_wait_timeout_secs: default_lock_wait_timeout_secs(),
            tight_window_secs: default_tight_window_secs(),
            per_page: default_per_page(),
        }
    }
}

impl Config {
    pub fn lock_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_wait_timeout_secs)
    }

    pub fn tight_window(&self) -> Duration {
        Duration::from_secs(self.tight_window_secs)
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

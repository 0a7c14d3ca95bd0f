// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheOptions;
use crate::utils::{RetryOptions, DEFAULT_MAX_JITTER_MS};

pub const DEFAULT_WEBHOOK_URL: &str = "http://localhost:5678/webhook/refine-prompt";
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/prompt-refiner.sock";
pub const DEFAULT_CACHE_TTL_MS: u64 = 60_000;
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 200;

/// Webhook call settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Refinement webhook endpoint
    pub webhook_url: String,
    /// Per-attempt request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

impl RefinerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_options(&self) -> RetryOptions {
        RetryOptions {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
        }
    }
}

/// Daemon process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Unix socket the daemon listens on
    pub socket_path: PathBuf,
    /// Cache entry lifetime in milliseconds
    pub cache_ttl_ms: u64,
    /// Maximum cached prompts
    pub cache_max_entries: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
        }
    }
}

impl DaemonConfig {
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            ttl: Duration::from_millis(self.cache_ttl_ms),
            max_entries: self.cache_max_entries,
        }
    }
}

/// Caller-side settings: whether to go through the daemon and how long to wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub use_daemon: bool,
    pub socket_path: PathBuf,
    pub timeout_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            use_daemon: false,
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Every resolved setting, one section per consumer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub refiner: RefinerConfig,
    pub daemon: DaemonConfig,
    pub client: CliConfig,
}

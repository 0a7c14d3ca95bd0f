// Per-call refinement options

use std::path::PathBuf;

use crate::client::DaemonClientOptions;
use crate::config::{RefinerConfig, Settings};

/// Per-call overrides; `None` falls through to the loaded settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefineOptions {
    pub url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub use_daemon: Option<bool>,
    pub socket_path: Option<PathBuf>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

impl RefineOptions {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_daemon(mut self, socket_path: impl Into<PathBuf>) -> Self {
        self.use_daemon = Some(true);
        self.socket_path = Some(socket_path.into());
        self
    }

    /// Field-by-field overlay: anything set in `overrides` wins
    pub fn merge(&self, overrides: &RefineOptions) -> RefineOptions {
        RefineOptions {
            url: overrides.url.clone().or_else(|| self.url.clone()),
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            use_daemon: overrides.use_daemon.or(self.use_daemon),
            socket_path: overrides
                .socket_path
                .clone()
                .or_else(|| self.socket_path.clone()),
            max_retries: overrides.max_retries.or(self.max_retries),
            base_delay_ms: overrides.base_delay_ms.or(self.base_delay_ms),
        }
    }

    pub(crate) fn resolve_use_daemon(&self, settings: &Settings) -> bool {
        self.use_daemon.unwrap_or(settings.client.use_daemon)
    }

    pub(crate) fn resolve_webhook(&self, settings: &Settings) -> RefinerConfig {
        let base = &settings.refiner;
        RefinerConfig {
            webhook_url: self.url.clone().unwrap_or_else(|| base.webhook_url.clone()),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            base_delay_ms: self.base_delay_ms.unwrap_or(base.base_delay_ms),
        }
    }

    pub(crate) fn resolve_daemon(&self, settings: &Settings) -> DaemonClientOptions {
        let mut options = DaemonClientOptions::from_cli_config(&settings.client);
        if let Some(socket_path) = &self.socket_path {
            options.socket_path = socket_path.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            options.timeout_ms = timeout_ms;
        }
        options
    }
}

// Configuration module
// Resolved config structs handed to the core, plus the loader that builds them

mod loader;
mod settings;

pub use loader::{apply_env_overrides, config_path, load_from_path, load_settings, settings_from_lookup};
pub use settings::{
    CliConfig, DaemonConfig, RefinerConfig, Settings, DEFAULT_BASE_DELAY_MS,
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_MS, DEFAULT_MAX_RETRIES, DEFAULT_SOCKET_PATH,
    DEFAULT_TIMEOUT_MS, DEFAULT_WEBHOOK_URL,
};

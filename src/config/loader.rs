// Configuration loader
// Reads ~/.prompt-refiner/config.toml if present, then applies REFINER_* env vars

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use super::settings::Settings;
use crate::utils::validate_url;

const ENV_WEBHOOK_URL: &str = "REFINER_WEBHOOK_URL";
const ENV_TIMEOUT_MS: &str = "REFINER_TIMEOUT_MS";
const ENV_MAX_RETRIES: &str = "REFINER_MAX_RETRIES";
const ENV_BASE_DELAY_MS: &str = "REFINER_BASE_DELAY_MS";
const ENV_DAEMON_SOCKET: &str = "REFINER_DAEMON_SOCKET";
const ENV_CACHE_TTL_MS: &str = "REFINER_CACHE_TTL_MS";
const ENV_CACHE_MAX: &str = "REFINER_CACHE_MAX";
const ENV_DAEMON: &str = "REFINER_DAEMON";

/// Default config file location
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".prompt-refiner").join("config.toml"))
}

/// Load settings from the config file and the process environment
pub fn load_settings() -> Result<Settings> {
    let base = match config_path() {
        Some(path) => load_from_path(&path)?.unwrap_or_default(),
        None => Settings::default(),
    };

    let settings = apply_env_overrides(base, |key| std::env::var(key).ok());

    if !validate_url(&settings.refiner.webhook_url) {
        warn!(
            url = %settings.refiner.webhook_url,
            "Webhook URL is not a valid http(s) URL"
        );
    }

    Ok(settings)
}

/// Parse a TOML config file, returning `None` if it does not exist
pub fn load_from_path(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let settings: Settings = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    debug!(path = %path.display(), "Loaded config file");
    Ok(Some(settings))
}

/// Built-in defaults overlaid with values from `lookup`
pub fn settings_from_lookup<F>(lookup: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    apply_env_overrides(Settings::default(), lookup)
}

/// Overlay environment values onto `settings`
///
/// Values that fail to parse leave the existing setting in place.
pub fn apply_env_overrides<F>(mut settings: Settings, lookup: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_WEBHOOK_URL) {
        settings.refiner.webhook_url = url;
    }
    if let Some(timeout_ms) = parse_var(&lookup, ENV_TIMEOUT_MS) {
        settings.refiner.timeout_ms = timeout_ms;
        settings.client.timeout_ms = timeout_ms;
    }
    if let Some(max_retries) = parse_var(&lookup, ENV_MAX_RETRIES) {
        settings.refiner.max_retries = max_retries;
    }
    if let Some(base_delay_ms) = parse_var(&lookup, ENV_BASE_DELAY_MS) {
        settings.refiner.base_delay_ms = base_delay_ms;
    }
    if let Some(socket) = lookup(ENV_DAEMON_SOCKET) {
        settings.daemon.socket_path = PathBuf::from(&socket);
        settings.client.socket_path = PathBuf::from(socket);
    }
    if let Some(ttl) = parse_var(&lookup, ENV_CACHE_TTL_MS) {
        settings.daemon.cache_ttl_ms = ttl;
    }
    if let Some(max_entries) = parse_var(&lookup, ENV_CACHE_MAX) {
        settings.daemon.cache_max_entries = max_entries;
    }
    if let Some(flag) = lookup(ENV_DAEMON) {
        settings.client.use_daemon = parse_bool(&flag);
    }

    settings
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment value");
            None
        }
    }
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

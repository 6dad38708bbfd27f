//! Configuration loading: defaults, then an optional JSON file, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::DepositConfig;
use crate::validate::{parse_log_format, parse_u32, parse_u64, parse_usize, validate};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "DEPOSIT_CONFIG";

/// Load configuration from the process environment.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be read or parsed, an
/// override is malformed, or the merged configuration fails validation.
pub fn load() -> ConfigResult<DepositConfig> {
    load_with(|name| std::env::var(name).ok())
}

/// Load configuration using `lookup` in place of the process environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with<F>(lookup: F) -> ConfigResult<DepositConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match lookup(CONFIG_PATH_ENV).filter(|path| !path.trim().is_empty()) {
        Some(path) => read_file(&PathBuf::from(path))?,
        None => DepositConfig::default(),
    };
    apply_env_overrides(&mut config, &lookup)?;
    validate(&config)?;
    info!(
        lock_timeout_ms = config.locks.acquire_timeout_ms,
        queue_capacity = config.queue.capacity,
        queue_concurrency = config.queue.concurrency,
        "configuration loaded"
    );
    Ok(config)
}

fn read_file(path: &Path) -> ConfigResult<DepositConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "read configuration file");
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut DepositConfig, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup("DEPOSIT_LOCK_TIMEOUT_MS") {
        config.locks.acquire_timeout_ms = parse_u64("DEPOSIT_LOCK_TIMEOUT_MS", &raw)?;
    }
    if let Some(raw) = lookup("DEPOSIT_QUEUE_CAPACITY") {
        config.queue.capacity = parse_usize("DEPOSIT_QUEUE_CAPACITY", &raw)?;
    }
    if let Some(raw) = lookup("DEPOSIT_QUEUE_CONCURRENCY") {
        config.queue.concurrency = parse_usize("DEPOSIT_QUEUE_CONCURRENCY", &raw)?;
    }
    if let Some(raw) = lookup("DEPOSIT_QUEUE_MAX_ATTEMPTS") {
        config.queue.max_attempts = parse_u32("DEPOSIT_QUEUE_MAX_ATTEMPTS", &raw)?;
    }
    if let Some(raw) = lookup("DEPOSIT_QUEUE_RETRY_BACKOFF_MS") {
        config.queue.retry_backoff_ms = parse_u64("DEPOSIT_QUEUE_RETRY_BACKOFF_MS", &raw)?;
    }
    if let Some(raw) = lookup("DEPOSIT_EVENTS_REPLAY_CAPACITY") {
        config.events.replay_capacity = parse_usize("DEPOSIT_EVENTS_REPLAY_CAPACITY", &raw)?;
    }
    if let Some(raw) = lookup("DEPOSIT_LOG_LEVEL") {
        config.telemetry.level = raw;
    }
    if let Some(raw) = lookup("DEPOSIT_LOG_FORMAT") {
        config.telemetry.format = Some(parse_log_format(&raw)?);
    }
    Ok(())
}

//! Validation helpers and parsing utilities for configuration values.

use crate::error::{ConfigError, ConfigResult};
use crate::model::{DepositConfig, LogFormatSetting};

/// Reject configurations that would stall or disable the services.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` for the first offending field.
pub fn validate(config: &DepositConfig) -> ConfigResult<()> {
    ensure_positive("locks", "acquire_timeout_ms", config.locks.acquire_timeout_ms)?;
    ensure_positive("queue", "capacity", config.queue.capacity as u64)?;
    ensure_positive("queue", "concurrency", config.queue.concurrency as u64)?;
    ensure_positive("queue", "max_attempts", u64::from(config.queue.max_attempts))?;
    ensure_positive("events", "replay_capacity", config.events.replay_capacity as u64)?;
    if config.telemetry.level.trim().is_empty() {
        return Err(ConfigError::InvalidField {
            section: "telemetry",
            field: "level",
            value: None,
            reason: "must not be empty",
        });
    }
    Ok(())
}

fn ensure_positive(section: &'static str, field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            section,
            field,
            value: None,
            reason: "must be greater than zero",
        });
    }
    Ok(())
}

pub(crate) fn parse_u64(field: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid("env", field, raw, "must be an unsigned integer"))
}

pub(crate) fn parse_usize(field: &'static str, raw: &str) -> ConfigResult<usize> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid("env", field, raw, "must be an unsigned integer"))
}

pub(crate) fn parse_u32(field: &'static str, raw: &str) -> ConfigResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid("env", field, raw, "must be an unsigned integer"))
}

pub(crate) fn parse_log_format(raw: &str) -> ConfigResult<LogFormatSetting> {
    match raw.trim() {
        "pretty" => Ok(LogFormatSetting::Pretty),
        "json" => Ok(LogFormatSetting::Json),
        other => Err(ConfigError::invalid(
            "env",
            "DEPOSIT_LOG_FORMAT",
            other,
            "must be `pretty` or `json`",
        )),
    }
}

//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BridgeConfig, DatabaseConfig, FilterConfig, LogOutput, LoggingConfig};

/// Largest accepted `bot.heartbeat_interval`, in seconds (one day).
pub const MAX_HEARTBEAT_INTERVAL_SECS: i64 = 86_400;

/// Validates the entire configuration.
pub fn validate_config(config: &BridgeConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_database(&config.database)?;
    validate_filter(&config.filter)?;

    if config.bot.cache_dir.as_os_str().is_empty() {
        return Err(ConfigError::validation("bot.cache_dir cannot be empty"));
    }

    if config.bot.heartbeat_interval > MAX_HEARTBEAT_INTERVAL_SECS {
        return Err(ConfigError::validation(format!(
            "bot.heartbeat_interval must be at most {MAX_HEARTBEAT_INTERVAL_SECS} seconds, got {}",
            config.bot.heartbeat_interval
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output = \"file\"",
        ));
    }

    if let Some(target) = logging.filters.keys().find(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid log filter target: {target:?}"
        )));
    }

    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> ConfigResult<()> {
    if database.enabled && database.path.as_os_str().is_empty() {
        return Err(ConfigError::validation(
            "database.path cannot be empty while the database is enabled",
        ));
    }
    Ok(())
}

fn validate_filter(filter: &FilterConfig) -> ConfigResult<()> {
    if let Some(path) = &filter.path
        && path.as_os_str().is_empty()
    {
        return Err(ConfigError::validation("filter.path cannot be empty"));
    }
    Ok(())
}

//! Event filter file loading.

use cqbridge_core::FilterExpr;
use tracing::{info, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::FilterConfig;

/// Loads the event filter named by the configuration.
///
/// Returns `Ok(None)` when no path is configured or the file does not exist;
/// a file that exists but does not parse is an error.
pub fn load_filter(config: &FilterConfig) -> ConfigResult<Option<FilterExpr>> {
    let Some(path) = config.path.as_deref() else {
        return Ok(None);
    };

    if !path.exists() {
        warn!(path = %path.display(), "Event filter file not found, dispatching every event");
        return Ok(None);
    }

    let text = std::fs::read_to_string(path)?;
    let filter = FilterExpr::parse(&text).map_err(|e| ConfigError::invalid_filter(path, e))?;
    info!(path = %path.display(), "Event filter loaded");
    Ok(Some(filter))
}

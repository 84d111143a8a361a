//! Configuration for the cqbridge runtime.
//!
//! Layered loading (files, environment, overrides) through figment,
//! validation, and event filter file loading.

pub mod error;
pub mod filter;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use filter::load_filter;
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    BridgeConfig, DatabaseConfig, FilterConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    SpanEventConfig,
};
pub use validation::{MAX_HEARTBEAT_INTERVAL_SECS, validate_config};

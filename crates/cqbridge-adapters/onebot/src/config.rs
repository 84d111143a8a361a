//! Bot options.
//!
//! Loaded from the `[bot]` section of the runtime configuration file.
//!
//! # Example Configuration
//!
//! ```toml
//! [bot]
//! heartbeat_interval = 5      # seconds; 0 or less disables the heartbeat
//! force_fragmented = false    # always split long group messages
//! post_format = "string"      # "string" (CQ code) or "array"
//! cache_dir = "data/cache"    # upload cache files
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::model::PostFormat;

/// Options controlling a [`CqBot`](crate::CqBot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotOptions {
    /// Heartbeat interval in seconds. Non-positive disables the heartbeat.
    pub heartbeat_interval: i64,

    /// Forwarded to the client on every group send.
    pub force_fragmented: bool,

    /// Shape of the `message` field in dispatched events.
    pub post_format: PostFormat,

    /// Directory for upload cache files.
    pub cache_dir: PathBuf,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            heartbeat_interval: 5,
            force_fragmented: false,
            post_format: PostFormat::String,
            cache_dir: PathBuf::from("data/cache"),
        }
    }
}

//! cqbridge Runtime - configuration, logging and the event pump.
//!
//! This crate provides:
//! - Layered configuration loading and validation ([`config`])
//! - `tracing` subscriber setup and a panic hook ([`logging`])
//! - The [`BridgeRuntime`], which opens the message store, builds a
//!   [`CqBot`](cqbridge_adapter_onebot::CqBot) for a protocol client and
//!   pumps inbound events into it until shutdown
//!
//! ```ignore
//! use cqbridge_runtime::BridgeRuntime;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BridgeRuntime::load()?;
//!
//!     let (events_tx, events_rx) = mpsc::channel(256);
//!     let client = connect_client(events_tx).await?;
//!
//!     let bot = runtime.start(client)?;
//!     bot.on_event_push(|event| async move {
//!         tracing::info!(event = %event.to_json(), "event");
//!     });
//!
//!     // Run until Ctrl+C
//!     runtime.run(bot, events_rx).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{BridgeConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BridgeRuntime, RuntimeBuilder, SHUTDOWN_GRACE};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module with the common logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}

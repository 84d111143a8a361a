//! # cqbridge
//!
//! Presents a connected messaging-protocol client as a CQHTTP-style bot.
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐  normalized   ┌────────────┐────▶ subscriber
//! protocol client ────▶│    CqBot     │──── events ──▶│ Dispatcher │────▶ subscriber
//!        ▲             │ store/cache  │               └────────────┘────▶ subscriber
//!        └──── sends ──│   resolver   │◀── send_group_message / send_private_message
//!                      └──────────────┘
//! ```
//!
//! - **Core**: global message ids, the compressed message store, the
//!   dispatcher, event filters and the heartbeat
//! - **Adapter**: the [`ProtocolClient`](adapter::ProtocolClient) seam,
//!   outbound resolution, the send pipeline and inbound normalization
//! - **Runtime**: configuration, logging and the event pump
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cqbridge::prelude::*;
//!
//! let runtime = BridgeRuntime::load()?;
//! let bot = runtime.start(client)?;
//!
//! bot.on_event_push(|event| async move {
//!     info!(event = %event.to_json(), "event");
//! });
//!
//! let id = bot
//!     .send_group_message(123456, SendingMessage::new().text("hello"))
//!     .await;
//!
//! runtime.run(bot, events).await;
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use cqbridge_adapter_onebot as adapter;
pub use cqbridge_core as core;
pub use cqbridge_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use cqbridge::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use cqbridge_runtime::{BridgeConfig, BridgeRuntime, RuntimeError, RuntimeResult};

    // Bot and its protocol seam
    pub use cqbridge_adapter_onebot::{
        BotOptions, ClientError, ClientResult, CqBot, Element, InboundEvent, OutgoingElement,
        ProtocolClient, SendingMessage,
    };

    // Records, ids and filters
    pub use cqbridge_core::{EventFilter, FilterExpr, MessageId, Msg, global_id};

    // Logging
    pub use cqbridge_runtime::prelude::*;
}

//! # cqbridge Core
//!
//! The core engine of the cqbridge mediation layer.
//!
//! This crate provides the protocol-independent building blocks that sit
//! between a connected messaging-protocol client and the subscribers that
//! consume its events.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! - **Event records**: schema-less field maps ([`Msg`]) used for events,
//!   persisted records and structured error payloads
//! - **Identity scheme**: deterministic 32-bit global message ids ([`global_id`])
//! - **Errors**: [`StoreError`], [`FilterError`]
//!
//! ### Framework Layer
//!
//! - **Dispatcher**: concurrent, failure-isolated fan-out ([`EventDispatcher`])
//! - **Filter**: JSON filter expressions ([`FilterExpr`], [`EventFilter`])
//! - **Heartbeat**: cancellable periodic meta events ([`Heartbeat`])
//!
//! ### Storage Layer
//!
//! - **KV backends**: [`KvStore`], [`SqliteKvStore`], [`MemoryKvStore`]
//! - **Message store**: compressed records keyed by global id ([`MessageStore`])
//!
//! ## Fan-out
//!
//! ```text
//!                        ┌────────────┐────▶ handler (task)
//! inbound / heartbeat ──▶│ Dispatcher │────▶ handler (task)
//!                        └────────────┘────▶ handler (task)
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use cqbridge_core::{EventDispatcher, Msg};
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.register(|event| async move {
//!     println!("{}", event.to_json());
//! });
//!
//! let mut event = Msg::new();
//! event.insert("post_type", "message");
//! dispatcher.dispatch(event);
//! ```

pub mod foundation;
pub mod framework;
pub mod storage;

pub use foundation::{
    FilterError, FilterResult, MessageId, Msg, StoreError, StoreResult, global_id, store_key,
};

pub use framework::{
    BoxFuture, EventDispatcher, EventFilter, EventHandler, FilterExpr, Heartbeat,
    SLOW_HANDLER_THRESHOLD,
};

pub use storage::{KvStore, MemoryKvStore, MessageStore, SqliteKvStore};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{EventDispatcher, EventFilter, EventHandler, FilterExpr};
    pub use super::storage::MessageStore;
}

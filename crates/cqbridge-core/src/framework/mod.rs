//! Framework layer - Event processing.
//!
//! This module contains the inbound half of the mediation layer:
//! - Concurrent, failure-isolated fan-out to subscribers
//! - Filter expressions deciding which events are delivered at all
//! - The periodic heartbeat meta event

pub mod dispatcher;
pub mod filter;
pub mod heartbeat;

pub use dispatcher::{BoxFuture, EventDispatcher, EventHandler, SLOW_HANDLER_THRESHOLD};
pub use filter::{EventFilter, FilterExpr};
pub use heartbeat::Heartbeat;

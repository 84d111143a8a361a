//! Storage layer - Durable message records.
//!
//! - [`kv`]: byte-level key-value backends behind the [`KvStore`] trait
//! - [`message_store`]: compressed [`Msg`](crate::Msg) records keyed by global id

pub mod kv;
pub mod message_store;

pub use kv::{KvStore, MemoryKvStore, SqliteKvStore};
pub use message_store::MessageStore;

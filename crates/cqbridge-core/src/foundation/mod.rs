//! Foundation layer - Core abstractions and type system.
//!
//! This module contains the fundamental building blocks of cqbridge:
//! - Schema-less event records
//! - The global message identity scheme
//! - Error types shared by the storage and framework layers

pub mod error;
pub mod identity;
pub mod msg;

pub use error::{FilterError, FilterResult, StoreError, StoreResult};
pub use identity::{MessageId, global_id, store_key};
pub use msg::Msg;

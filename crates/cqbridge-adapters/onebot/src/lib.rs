//! # cqbridge Adapter for CQHTTP-style bots
//!
//! This crate mediates between a connected messaging-protocol client and
//! event subscribers speaking the CQHTTP/OneBot v11 event vocabulary.
//!
//! ## Overview
//!
//! - [`ProtocolClient`]: the seam to the protocol library (implemented by
//!   the embedding application)
//! - [`CqBot`]: owns the store, caches, dispatcher and heartbeat
//! - Outbound: [`SendingMessage`] → [`OutboundResolver`] → send pipeline
//! - Inbound: [`InboundEvent`] → normalization → dispatched [`Msg`](cqbridge_core::Msg)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cqbridge_adapter_onebot::{BotOptions, CqBot, InboundEvent, SendingMessage};
//! use cqbridge_core::MessageStore;
//!
//! let bot = Arc::new(CqBot::new(client, MessageStore::disabled(), BotOptions::default()));
//! bot.on_event_push(|event| async move {
//!     println!("{}", event.to_json());
//! });
//!
//! // Forward what the protocol client observes
//! bot.handle_event(inbound).await;
//!
//! // Reply
//! let id = bot.send_group_message(10001, SendingMessage::new().text("pong")).await;
//! ```
//!
//! ## Message Ids
//!
//! Sends return a global message id, `0` when the message was turned into a
//! standalone action (poke, gift, music share), or `-1` when nothing was
//! sent.

pub mod bot;
pub mod cache;
pub mod client;
pub mod config;
pub mod events;
pub mod model;
pub mod resolver;
pub mod send;

pub use bot::{CqBot, status_snapshot};
pub use cache::{CacheMap, RelationshipCache};
pub use client::{
    ClientError, ClientResult, ClientStatistics, FriendInfo, GroupInfo, GroupMemberInfo,
    MemberPermission, ProtocolClient,
};
pub use config::BotOptions;
pub use model::{
    AnonymousInfo, Element, FriendAdded, FriendRecall, FriendRequest, GroupMessage, GroupMute,
    GroupRecall, ImageSource, InboundEvent, MemberChange, MusicKind, MusicShare, OutgoingElement,
    PostFormat, PrivateMessage, Sender, SendingMessage, TempMessage,
};
pub use resolver::{AT_ALL_TEXT, Channel, OutboundResolver, Resolution, ShortCircuit};
pub use send::{MESSAGE_ID_ACTION, MESSAGE_ID_FAILED};

/// Prelude for common imports.
pub mod prelude {
    pub use super::bot::CqBot;
    pub use super::client::{ClientError, ClientResult, ProtocolClient};
    pub use super::config::BotOptions;
    pub use super::model::{Element, InboundEvent, OutgoingElement, SendingMessage};
}

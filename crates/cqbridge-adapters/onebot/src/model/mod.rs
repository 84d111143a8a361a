//! Data model shared by the client seam, the resolver and event normalization.

pub mod cqcode;
pub mod element;
pub mod event;
pub mod message;
pub mod outgoing;

pub use cqcode::{PostFormat, escape_cq_text, escape_cq_value, to_array, to_cq_string, to_formatted};
pub use element::{AnonymousInfo, Element, MusicKind, MusicShare, Sender};
pub use event::{
    FriendAdded, FriendRecall, FriendRequest, GroupMute, GroupRecall, InboundEvent, MemberChange,
};
pub use message::{GroupMessage, PrivateMessage, TempMessage};
pub use outgoing::{ImageSource, OutgoingElement, SendingMessage};

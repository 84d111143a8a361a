//! Raw events reported by the protocol client.
//!
//! [`InboundEvent`] is the input side of the mediator: the embedding
//! application forwards whatever its protocol client observes, and
//! [`CqBot::handle_event`](crate::CqBot::handle_event) normalizes it into a
//! dispatched [`Msg`](cqbridge_core::Msg).

use serde::{Deserialize, Serialize};

use super::message::{GroupMessage, PrivateMessage, TempMessage};

/// An event observed by the protocol client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// A one-to-one message.
    PrivateMessage(PrivateMessage),
    /// A group message, including echoes of the bot's own messages.
    GroupMessage(GroupMessage),
    /// A temporary-session message.
    TempMessage(TempMessage),
    /// Someone asked to become a contact.
    FriendRequest(FriendRequest),
    /// A group message was recalled.
    GroupRecall(GroupRecall),
    /// A private message was recalled.
    FriendRecall(FriendRecall),
    /// A new contact was added.
    FriendAdded(FriendAdded),
    /// A member joined a group.
    MemberJoined(MemberChange),
    /// A member left or was removed from a group.
    MemberLeft(MemberChange),
    /// A member or the whole group was muted or unmuted.
    GroupMute(GroupMute),
}

impl InboundEvent {
    /// Returns the event name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::PrivateMessage(_) => "private_message",
            InboundEvent::GroupMessage(_) => "group_message",
            InboundEvent::TempMessage(_) => "temp_message",
            InboundEvent::FriendRequest(_) => "friend_request",
            InboundEvent::GroupRecall(_) => "group_recall",
            InboundEvent::FriendRecall(_) => "friend_recall",
            InboundEvent::FriendAdded(_) => "friend_added",
            InboundEvent::MemberJoined(_) => "member_joined",
            InboundEvent::MemberLeft(_) => "member_left",
            InboundEvent::GroupMute(_) => "group_mute",
        }
    }
}

/// Contact request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    /// Protocol request id; its decimal form is the approval token.
    pub request_id: i64,
    /// Requesting user.
    pub requester_uin: i64,
    /// Requesting user's nickname.
    #[serde(default)]
    pub requester_nick: String,
    /// Attached greeting.
    #[serde(default)]
    pub message: String,
}

impl FriendRequest {
    /// Returns the opaque token used to approve or reject the request.
    pub fn flag(&self) -> String {
        self.request_id.to_string()
    }
}

/// Recall of a group message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecall {
    /// Group number.
    pub group_code: i64,
    /// User who performed the recall.
    pub operator_uin: i64,
    /// Author of the recalled message.
    pub author_uin: i64,
    /// Protocol sequence of the recalled message.
    pub message_id: i32,
    /// Unix time of the recall.
    pub time: i64,
}

/// Recall of a private message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRecall {
    /// Contact who recalled the message.
    pub friend_uin: i64,
    /// Protocol sequence of the recalled message.
    pub message_id: i32,
    /// Unix time of the recall.
    pub time: i64,
}

/// A contact was added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendAdded {
    /// New contact.
    pub uin: i64,
    /// New contact's nickname.
    #[serde(default)]
    pub nickname: String,
}

/// Group membership change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberChange {
    /// Group number.
    pub group_code: i64,
    /// Member who joined or left.
    pub member_uin: i64,
    /// Member who caused the change, if any (inviter or kicker).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_uin: Option<i64>,
}

/// Mute or unmute in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMute {
    /// Group number.
    pub group_code: i64,
    /// User who changed the mute.
    pub operator_uin: i64,
    /// Muted user; `0` for the whole group.
    pub target_uin: i64,
    /// Mute duration in seconds; `0` lifts the mute.
    pub duration: i32,
}

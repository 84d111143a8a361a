//! The protocol client seam.
//!
//! cqbridge never speaks the messaging protocol itself. Everything it needs
//! from a connected account (uploads, sends, roster lookups) goes through
//! [`ProtocolClient`], which the embedding application implements over its
//! protocol library of choice.
//!
//! Roster lookups are synchronous reads of the client's local caches;
//! everything that talks to the server is async.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Element, GroupMessage, MusicShare, PrivateMessage, TempMessage};

// ============================================================================
// Errors
// ============================================================================

/// Errors reported by a protocol client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Media upload failed.
    #[error("upload failed: {0}")]
    Upload(String),

    /// Transmission failed.
    #[error("send failed: {0}")]
    Send(String),

    /// The server silently dropped the message; the account is likely
    /// under risk control.
    #[error("message rejected by risk control")]
    RiskControlled,

    /// The group is not known to the client.
    #[error("group {0} not found")]
    GroupNotFound(i64),

    /// The member is not known to the client.
    #[error("member {uin} not found in group {group}")]
    MemberNotFound {
        /// Group number.
        group: i64,
        /// Member user number.
        uin: i64,
    },

    /// Reading local media failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client is offline.
    #[error("client is offline")]
    Offline,
}

impl ClientError {
    /// Creates an upload error.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    /// Creates a send error.
    pub fn send(msg: impl Into<String>) -> Self {
        Self::Send(msg.into())
    }
}

/// Result type for protocol client calls.
pub type ClientResult<T> = Result<T, ClientError>;

// ============================================================================
// Roster Types
// ============================================================================

/// Permission level of a group member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberPermission {
    /// Group owner.
    Owner,
    /// Group administrator.
    #[serde(rename = "admin")]
    Administrator,
    /// Regular member.
    #[default]
    Member,
}

impl MemberPermission {
    /// Returns the role string used in event payloads.
    pub fn as_role(&self) -> &'static str {
        match self {
            MemberPermission::Owner => "owner",
            MemberPermission::Administrator => "admin",
            MemberPermission::Member => "member",
        }
    }
}

/// A group known to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Group number.
    pub code: i64,
    /// Display name.
    pub name: String,
    /// Member count.
    #[serde(default)]
    pub member_count: u32,
}

/// A member of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMemberInfo {
    /// Group number.
    pub group_code: i64,
    /// Member user number.
    pub uin: i64,
    /// Account nickname.
    #[serde(default)]
    pub nickname: String,
    /// Group card name.
    #[serde(default)]
    pub card_name: String,
    /// Special title granted by the owner.
    #[serde(default)]
    pub special_title: String,
    /// Member level.
    #[serde(default)]
    pub level: u16,
    /// Unix time the member joined.
    #[serde(default)]
    pub join_time: i64,
    /// Unix time of the member's last message.
    #[serde(default)]
    pub last_speak_time: i64,
    /// Permission level.
    #[serde(default)]
    pub permission: MemberPermission,
}

impl GroupMemberInfo {
    /// Returns the card name if set, otherwise the nickname.
    pub fn display_name(&self) -> &str {
        if self.card_name.is_empty() {
            &self.nickname
        } else {
            &self.card_name
        }
    }
}

/// A mutual contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendInfo {
    /// User number.
    pub uin: i64,
    /// Account nickname.
    #[serde(default)]
    pub nickname: String,
    /// Remark set by the bot account.
    #[serde(default)]
    pub remark: String,
}

/// Traffic counters reported in status snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatistics {
    /// Packets received.
    pub packet_received: u64,
    /// Packets sent.
    pub packet_sent: u64,
    /// Packets lost.
    pub packet_lost: u64,
    /// Messages received.
    pub message_received: u64,
    /// Messages sent.
    pub message_sent: u64,
    /// Disconnections.
    pub disconnect_times: u32,
    /// Connection losses.
    pub lost_times: u32,
}

// ============================================================================
// ProtocolClient
// ============================================================================

/// A connected messaging-protocol client.
///
/// Implementations must be thread-safe; the mediator calls them from many
/// tasks at once.
#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// Returns the account's user number.
    fn uin(&self) -> i64;

    /// Returns whether the client is connected.
    fn is_online(&self) -> bool;

    /// Returns traffic counters.
    fn statistics(&self) -> ClientStatistics;

    // ---- roster ------------------------------------------------------------

    /// Looks up a group in the local cache.
    fn find_group(&self, group: i64) -> Option<GroupInfo>;

    /// Looks up a group member in the local cache.
    fn find_group_member(&self, group: i64, uin: i64) -> Option<GroupMemberInfo>;

    /// Looks up a contact in the local cache.
    fn find_friend(&self, uin: i64) -> Option<FriendInfo>;

    /// Fetches the member list of `group` from the server, replacing the
    /// local cache.
    async fn refresh_group_members(&self, group: i64) -> ClientResult<Vec<GroupMemberInfo>>;

    // ---- uploads -----------------------------------------------------------

    /// Uploads image bytes for use in `group`.
    async fn upload_group_image(&self, group: i64, data: Vec<u8>) -> ClientResult<Element>;

    /// Uploads an image file for use in `group`.
    async fn upload_group_image_by_file(&self, group: i64, path: &Path) -> ClientResult<Element>;

    /// Uploads image bytes for use with `target`.
    async fn upload_private_image(&self, target: i64, data: Vec<u8>) -> ClientResult<Element>;

    /// Uploads a short video with its thumbnail. `cache_file` is a stable
    /// path the client may use to cache upload state.
    async fn upload_group_short_video(
        &self,
        target: i64,
        video: Vec<u8>,
        thumb: Vec<u8>,
        cache_file: &Path,
    ) -> ClientResult<Element>;

    /// Uploads voice data for use in `group`.
    async fn upload_group_voice(&self, group: i64, data: Vec<u8>) -> ClientResult<Element>;

    /// Uploads voice data for use with `target`.
    async fn upload_private_voice(&self, target: i64, data: Vec<u8>) -> ClientResult<Element>;

    // ---- sending -----------------------------------------------------------

    /// Sends a group message.
    async fn send_group_message(
        &self,
        group: i64,
        elements: Vec<Element>,
        force_fragmented: bool,
    ) -> ClientResult<GroupMessage>;

    /// Sends a message to a contact or one-way peer.
    async fn send_private_message(
        &self,
        target: i64,
        elements: Vec<Element>,
    ) -> ClientResult<PrivateMessage>;

    /// Sends a temporary-session message through `group`.
    async fn send_temp_message(
        &self,
        group: i64,
        target: i64,
        elements: Vec<Element>,
    ) -> ClientResult<TempMessage>;

    // ---- actions -----------------------------------------------------------

    /// Sends a gift to a group member.
    async fn send_group_gift(&self, group: i64, target: i64, gift_id: u32) -> ClientResult<()>;

    /// Sends a music-share card to a group.
    async fn send_group_music_share(&self, group: i64, share: &MusicShare) -> ClientResult<()>;

    /// Sends a music-share card to a user.
    async fn send_private_music_share(&self, target: i64, share: &MusicShare) -> ClientResult<()>;

    /// Pokes a contact.
    async fn send_friend_poke(&self, target: i64) -> ClientResult<()>;

    /// Pokes a group member.
    async fn group_member_poke(&self, group: i64, target: i64) -> ClientResult<()>;
}

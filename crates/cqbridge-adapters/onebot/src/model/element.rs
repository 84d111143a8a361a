//! Transmittable message elements.
//!
//! An [`Element`] is a message part in the exact form the protocol client
//! accepts for transmission and reports for received messages. Locally
//! sourced media never appears here: it is first uploaded by the outbound
//! resolver, which yields the corresponding remote element.

use serde::{Deserialize, Serialize};

// ============================================================================
// Elements
// ============================================================================

/// A single protocol-level message element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Plain text.
    Text {
        /// The text content.
        content: String,
    },

    /// Built-in face/emoji.
    Face {
        /// Face index.
        id: i32,
    },

    /// Functional mention. A `target` of `0` mentions everyone.
    At {
        /// Mentioned user number.
        target: i64,
        /// Display text shown to clients.
        #[serde(default)]
        display: String,
    },

    /// Reply to an earlier message in the same conversation.
    Reply {
        /// Protocol sequence of the replied message.
        seq: i32,
        /// Author of the replied message.
        sender: i64,
        /// Unix time of the replied message.
        time: i64,
    },

    /// Image hosted for a group conversation.
    GroupImage {
        /// Remote image id.
        image_id: String,
        /// Download URL, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// Image hosted for a private conversation.
    FriendImage {
        /// Remote image id.
        image_id: String,
        /// Download URL, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// Short video.
    ShortVideo {
        /// Remote file name.
        name: String,
        /// Remote file uuid.
        uuid: String,
        /// Size in bytes.
        size: i64,
    },

    /// Voice clip.
    Voice {
        /// Remote file name.
        name: String,
        /// Download URL, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },

    /// Rich JSON card.
    LightApp {
        /// Raw card JSON.
        content: String,
    },

    /// Rich XML card.
    Service {
        /// Service id.
        id: i32,
        /// Raw card XML.
        content: String,
    },
}

impl Element {
    /// Creates a text element.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Creates a face element.
    pub fn face(id: i32) -> Self {
        Self::Face { id }
    }

    /// Creates a functional mention of `target`.
    pub fn at(target: i64, display: impl Into<String>) -> Self {
        Self::At {
            target,
            display: display.into(),
        }
    }

    /// Creates a functional mention of everyone.
    pub fn at_all() -> Self {
        Self::At {
            target: 0,
            display: "@全体成员".into(),
        }
    }

    /// Returns the element type name used in array-format payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Element::Text { .. } => "text",
            Element::Face { .. } => "face",
            Element::At { .. } => "at",
            Element::Reply { .. } => "reply",
            Element::GroupImage { .. } | Element::FriendImage { .. } => "image",
            Element::ShortVideo { .. } => "video",
            Element::Voice { .. } => "record",
            Element::LightApp { .. } => "json",
            Element::Service { .. } => "xml",
        }
    }

    /// Returns the text content if this is a text element.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Element::Text { content } => Some(content),
            _ => None,
        }
    }
}

// ============================================================================
// Music Share
// ============================================================================

/// Music platforms accepted for music-share cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MusicKind {
    /// QQ Music.
    Qq,
    /// NetEase Cloud Music.
    Cloud163,
    /// Migu Music.
    Migu,
    /// Kugou Music.
    Kugou,
    /// Kuwo Music.
    Kuwo,
}

/// A music-share card. Sent as a standalone action, never as an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicShare {
    /// Source platform.
    pub kind: MusicKind,
    /// Song title.
    pub title: String,
    /// Card summary line.
    #[serde(default)]
    pub summary: String,
    /// Preview text shown in conversation lists.
    #[serde(default)]
    pub brief: String,
    /// Jump URL.
    pub url: String,
    /// Cover image URL.
    #[serde(default)]
    pub picture_url: String,
    /// Audio URL.
    pub music_url: String,
}

// ============================================================================
// Sender
// ============================================================================

/// Anonymous identity used in a group message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousInfo {
    /// Opaque anonymous id.
    pub anonymous_id: String,
    /// Anonymous display nickname.
    pub anonymous_nick: String,
}

/// Author of a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sender {
    /// User number.
    pub uin: i64,
    /// Account nickname.
    #[serde(default)]
    pub nickname: String,
    /// Group card name (group messages only).
    #[serde(default)]
    pub card_name: String,
    /// Whether the author is a mutual contact of the bot.
    #[serde(default)]
    pub is_friend: bool,
    /// Anonymous identity, if the message was sent anonymously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anonymous: Option<AnonymousInfo>,
}

impl Sender {
    /// Returns the card name if set, otherwise the nickname.
    pub fn display_name(&self) -> &str {
        if self.card_name.is_empty() {
            &self.nickname
        } else {
            &self.card_name
        }
    }

    /// Returns `true` if the message was sent anonymously.
    pub fn is_anonymous(&self) -> bool {
        self.anonymous.is_some()
    }
}

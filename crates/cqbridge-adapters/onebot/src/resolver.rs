//! Outbound resolution.
//!
//! Turns a caller's [`SendingMessage`] into one of three outcomes:
//!
//! - [`Resolution::Action`]: the message contains a part that is really a
//!   standalone action (poke, gift, music share). The first such part wins
//!   and nothing else in the message is processed or uploaded.
//! - [`Resolution::Ready`]: every part was converted to a transmittable
//!   [`Element`]. Parts that failed to upload are dropped with a warning.
//! - [`Resolution::Empty`]: nothing transmittable remained.
//!
//! Which parts are actions depends on the [`Channel`]:
//!
//! | Part | Group | Private |
//! |------|-------|---------|
//! | poke | member poke | contact poke |
//! | gift | gift | dropped |
//! | music share | card | card |

use std::fmt;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::client::{ClientResult, MemberPermission, ProtocolClient};
use crate::model::{Element, ImageSource, MusicShare, OutgoingElement, SendingMessage};

/// Literal inserted in place of a mention-all that would not take effect.
pub const AT_ALL_TEXT: &str = "@全体成员";

/// The conversation a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// A group, by group number.
    Group(i64),
    /// A user, by user number.
    Private(i64),
}

impl Channel {
    /// Returns the scope code of the conversation.
    pub fn scope(&self) -> i64 {
        match self {
            Channel::Group(code) | Channel::Private(code) => *code,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Group(code) => write!(f, "group:{code}"),
            Channel::Private(uin) => write!(f, "private:{uin}"),
        }
    }
}

/// A standalone action found in an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum ShortCircuit {
    /// Poke a group member.
    GroupPoke {
        /// Group number.
        group: i64,
        /// Member to poke.
        target: i64,
    },
    /// Poke a contact.
    FriendPoke {
        /// User to poke.
        target: i64,
    },
    /// Send a gift to a group member.
    Gift {
        /// Group number.
        group: i64,
        /// Recipient.
        target: i64,
        /// Gift catalogue id.
        gift_id: u32,
    },
    /// Share music to a group.
    GroupMusic {
        /// Group number.
        group: i64,
        /// Card contents.
        share: MusicShare,
    },
    /// Share music to a user.
    PrivateMusic {
        /// User number.
        target: i64,
        /// Card contents.
        share: MusicShare,
    },
}

impl ShortCircuit {
    /// Returns the action name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ShortCircuit::GroupPoke { .. } | ShortCircuit::FriendPoke { .. } => "poke",
            ShortCircuit::Gift { .. } => "gift",
            ShortCircuit::GroupMusic { .. } | ShortCircuit::PrivateMusic { .. } => "music",
        }
    }
}

/// Outcome of resolving an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Transmit these elements.
    Ready(Vec<Element>),
    /// Perform this action instead of transmitting.
    Action(ShortCircuit),
    /// Nothing to send.
    Empty,
}

/// Resolves outgoing messages against a protocol client.
pub struct OutboundResolver<'a> {
    client: &'a dyn ProtocolClient,
    cache_dir: &'a Path,
}

impl<'a> OutboundResolver<'a> {
    /// Creates a resolver uploading through `client` and keeping video
    /// cache files under `cache_dir`.
    pub fn new(client: &'a dyn ProtocolClient, cache_dir: &'a Path) -> Self {
        Self { client, cache_dir }
    }

    /// Resolves `message` for `channel`.
    pub async fn resolve(&self, channel: Channel, message: SendingMessage) -> Resolution {
        let parts = message.into_elements();
        if let Some(action) = find_short_circuit(channel, &parts) {
            debug!(%channel, action = action.name(), "Message short-circuited to action");
            return Resolution::Action(action);
        }

        let mut elements = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(element) = self.resolve_part(channel, part).await {
                elements.push(element);
            }
        }

        if elements.is_empty() {
            Resolution::Empty
        } else {
            Resolution::Ready(elements)
        }
    }

    async fn resolve_part(&self, channel: Channel, part: OutgoingElement) -> Option<Element> {
        let kind = part.kind();
        let uploaded = match part {
            OutgoingElement::Text(content) => return Some(Element::text(content)),
            OutgoingElement::Element(element) => return Some(element),
            OutgoingElement::AtAll => return Some(self.mention_all(channel)),
            OutgoingElement::LocalImage(source) => self.upload_image(channel, source).await,
            OutgoingElement::LocalVideo { file, thumb } => {
                self.upload_video(channel, &file, &thumb).await
            }
            OutgoingElement::Voice { data } => match channel {
                Channel::Group(group) => self.client.upload_group_voice(group, data).await,
                Channel::Private(target) => self.client.upload_private_voice(target, data).await,
            },
            OutgoingElement::Poke { .. }
            | OutgoingElement::Gift { .. }
            | OutgoingElement::MusicShare(_) => {
                warn!(%channel, kind, "Action not supported on this channel, dropping element");
                return None;
            }
        };

        match uploaded {
            Ok(element) => Some(element),
            Err(e) => {
                warn!(%channel, kind, error = %e, "Upload failed, dropping element");
                None
            }
        }
    }

    async fn upload_image(&self, channel: Channel, source: ImageSource) -> ClientResult<Element> {
        match (channel, source) {
            (Channel::Group(group), ImageSource::File(path)) => {
                self.client.upload_group_image_by_file(group, &path).await
            }
            (Channel::Group(group), ImageSource::Bytes(data)) => {
                self.client.upload_group_image(group, data).await
            }
            (Channel::Private(target), ImageSource::File(path)) => {
                let data = tokio::fs::read(&path).await?;
                self.client.upload_private_image(target, data).await
            }
            (Channel::Private(target), ImageSource::Bytes(data)) => {
                self.client.upload_private_image(target, data).await
            }
        }
    }

    async fn upload_video(
        &self,
        channel: Channel,
        file: &Path,
        thumb: &Path,
    ) -> ClientResult<Element> {
        let video = tokio::fs::read(file).await?;
        let thumb = tokio::fs::read(thumb).await?;
        let cache_file = video_cache_file(self.cache_dir, &video, &thumb);
        self.client
            .upload_group_short_video(channel.scope(), video, thumb, &cache_file)
            .await
    }

    /// A mention-all only works for group owners and administrators; plain
    /// members get the literal text instead. Private conversations keep the
    /// element as is.
    fn mention_all(&self, channel: Channel) -> Element {
        let Channel::Group(group) = channel else {
            return Element::at_all();
        };
        let permission = self
            .client
            .find_group_member(group, self.client.uin())
            .map(|member| member.permission);
        match permission {
            Some(MemberPermission::Member) => Element::text(AT_ALL_TEXT),
            _ => Element::at_all(),
        }
    }
}

fn find_short_circuit(channel: Channel, parts: &[OutgoingElement]) -> Option<ShortCircuit> {
    parts.iter().find_map(|part| match (channel, part) {
        (Channel::Group(group), OutgoingElement::Poke { target }) => Some(ShortCircuit::GroupPoke {
            group,
            target: *target,
        }),
        (Channel::Private(_), OutgoingElement::Poke { target }) => {
            Some(ShortCircuit::FriendPoke { target: *target })
        }
        (Channel::Group(group), OutgoingElement::Gift { target, gift_id }) => {
            Some(ShortCircuit::Gift {
                group,
                target: *target,
                gift_id: *gift_id,
            })
        }
        (Channel::Group(group), OutgoingElement::MusicShare(share)) => {
            Some(ShortCircuit::GroupMusic {
                group,
                share: share.clone(),
            })
        }
        (Channel::Private(target), OutgoingElement::MusicShare(share)) => {
            Some(ShortCircuit::PrivateMusic {
                target,
                share: share.clone(),
            })
        }
        _ => None,
    })
}

/// Returns the cache file path for a video upload, named after the SHA-256
/// digest of the video followed by its thumbnail.
pub fn video_cache_file(cache_dir: &Path, video: &[u8], thumb: &[u8]) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(video);
    hasher.update(thumb);
    cache_dir.join(format!("{}.cache", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MusicKind;

    fn share() -> MusicShare {
        MusicShare {
            kind: MusicKind::Qq,
            title: "song".into(),
            summary: String::new(),
            brief: String::new(),
            url: "http://m".into(),
            picture_url: String::new(),
            music_url: "http://m.mp3".into(),
        }
    }

    #[test]
    fn test_first_action_wins() {
        let parts = [
            OutgoingElement::text("hi"),
            OutgoingElement::Poke { target: 42 },
            OutgoingElement::MusicShare(share()),
        ];
        assert_eq!(
            find_short_circuit(Channel::Group(10001), &parts),
            Some(ShortCircuit::GroupPoke {
                group: 10001,
                target: 42
            })
        );
        assert_eq!(
            find_short_circuit(Channel::Private(42), &parts),
            Some(ShortCircuit::FriendPoke { target: 42 })
        );
    }

    #[test]
    fn test_gift_is_group_only() {
        let parts = [
            OutgoingElement::Gift {
                target: 42,
                gift_id: 1,
            },
            OutgoingElement::MusicShare(share()),
        ];
        assert_eq!(
            find_short_circuit(Channel::Private(42), &parts),
            Some(ShortCircuit::PrivateMusic {
                target: 42,
                share: share()
            })
        );
        assert!(matches!(
            find_short_circuit(Channel::Group(1), &parts),
            Some(ShortCircuit::Gift { gift_id: 1, .. })
        ));
    }

    #[test]
    fn test_no_action() {
        let parts = [OutgoingElement::text("a"), OutgoingElement::AtAll];
        assert_eq!(find_short_circuit(Channel::Group(1), &parts), None);
    }

    #[test]
    fn test_video_cache_file_is_stable() {
        let dir = Path::new("data/cache");
        let a = video_cache_file(dir, b"video", b"thumb");
        let b = video_cache_file(dir, b"video", b"thumb");
        let c = video_cache_file(dir, b"video", b"other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(dir));
        let name = a.file_name().unwrap().to_str().unwrap();
        assert_eq!(name.len(), 64 + ".cache".len());
        assert!(name.ends_with(".cache"));
    }

    #[test]
    fn test_channel_display() {
        assert_eq!(Channel::Group(1).to_string(), "group:1");
        assert_eq!(Channel::Private(2).scope(), 2);
    }
}

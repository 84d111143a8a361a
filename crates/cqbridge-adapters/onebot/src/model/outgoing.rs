//! Outgoing messages as composed by callers.
//!
//! A [`SendingMessage`] may mix transmittable [`Element`]s with parts that
//! need work before transmission (local media that must be uploaded) or
//! that are not message parts at all (poke, gift, music share). The outbound
//! resolver turns it into something the protocol client can send.
//!
//! # Example
//!
//! ```rust,ignore
//! use cqbridge_adapter_onebot::{OutgoingElement, SendingMessage};
//!
//! let message = SendingMessage::new()
//!     .text("look: ")
//!     .push(OutgoingElement::image_file("data/images/cat.png"))
//!     .push(OutgoingElement::AtAll);
//! ```

use std::path::PathBuf;

use super::element::{Element, MusicShare};

/// Where a local image comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// A file on disk.
    File(PathBuf),
    /// Raw image bytes.
    Bytes(Vec<u8>),
}

/// A message part before outbound resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingElement {
    /// Plain text.
    Text(String),
    /// An already transmittable element, passed through untouched.
    Element(Element),
    /// Local image requiring upload.
    LocalImage(ImageSource),
    /// Local video and thumbnail files requiring upload.
    LocalVideo {
        /// Video file.
        file: PathBuf,
        /// Thumbnail image file.
        thumb: PathBuf,
    },
    /// Voice data requiring upload.
    Voice {
        /// Encoded voice bytes.
        data: Vec<u8>,
    },
    /// Mention of every group member.
    AtAll,
    /// Poke (nudge) a user.
    Poke {
        /// User to poke.
        target: i64,
    },
    /// Send a gift to a group member.
    Gift {
        /// Recipient.
        target: i64,
        /// Gift catalogue id.
        gift_id: u32,
    },
    /// Music-share card.
    MusicShare(MusicShare),
}

impl OutgoingElement {
    /// Creates a text part.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Creates a local image part read from `path`.
    pub fn image_file(path: impl Into<PathBuf>) -> Self {
        Self::LocalImage(ImageSource::File(path.into()))
    }

    /// Creates a local image part from raw bytes.
    pub fn image_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::LocalImage(ImageSource::Bytes(data.into()))
    }

    /// Returns the part name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutgoingElement::Text(_) => "text",
            OutgoingElement::Element(e) => e.kind(),
            OutgoingElement::LocalImage(_) => "image",
            OutgoingElement::LocalVideo { .. } => "video",
            OutgoingElement::Voice { .. } => "voice",
            OutgoingElement::AtAll => "at_all",
            OutgoingElement::Poke { .. } => "poke",
            OutgoingElement::Gift { .. } => "gift",
            OutgoingElement::MusicShare(_) => "music",
        }
    }
}

impl From<Element> for OutgoingElement {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// An ordered list of outgoing parts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendingMessage {
    elements: Vec<OutgoingElement>,
}

impl SendingMessage {
    /// Creates an empty message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a part (builder pattern).
    pub fn push(mut self, element: impl Into<OutgoingElement>) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Appends a text part (builder pattern).
    pub fn text(self, content: impl Into<String>) -> Self {
        self.push(OutgoingElement::text(content))
    }

    /// Returns the parts.
    pub fn elements(&self) -> &[OutgoingElement] {
        &self.elements
    }

    /// Returns `true` if there are no parts.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Consumes the message, returning its parts.
    pub fn into_elements(self) -> Vec<OutgoingElement> {
        self.elements
    }
}

impl From<Vec<OutgoingElement>> for SendingMessage {
    fn from(elements: Vec<OutgoingElement>) -> Self {
        Self { elements }
    }
}

impl FromIterator<OutgoingElement> for SendingMessage {
    fn from_iter<I: IntoIterator<Item = OutgoingElement>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_order() {
        let message = SendingMessage::new()
            .text("a")
            .push(Element::face(1))
            .push(OutgoingElement::AtAll);
        let kinds: Vec<_> = message.elements().iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, ["text", "face", "at_all"]);
        assert!(!message.is_empty());
        assert!(SendingMessage::new().is_empty());
    }
}

//! Messages as reported by the protocol client.
//!
//! These cover both received messages and the echo of messages the bot
//! itself sent. `id` is the protocol-local sequence number; the global id
//! is derived from it together with the conversation's scope code.

use serde::{Deserialize, Serialize};

use super::element::{Element, Sender};

/// A message in a group conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Protocol sequence number. `-1` signals a risk-controlled send.
    pub id: i32,
    /// Protocol internal id.
    pub internal_id: i32,
    /// Group number.
    pub group_code: i64,
    /// Group display name.
    pub group_name: String,
    /// Author.
    pub sender: Sender,
    /// Unix time in seconds.
    pub time: i64,
    /// Content.
    pub elements: Vec<Element>,
}

/// A message in a one-to-one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateMessage {
    /// Protocol sequence number. `-1` signals a risk-controlled send.
    pub id: i32,
    /// Protocol internal id.
    pub internal_id: i32,
    /// Recipient user number.
    pub target: i64,
    /// Author.
    pub sender: Sender,
    /// Unix time in seconds.
    pub time: i64,
    /// Content.
    pub elements: Vec<Element>,
}

impl PrivateMessage {
    /// Returns the user on the other side of the conversation, as seen from
    /// the account `self_uin`.
    pub fn peer(&self, self_uin: i64) -> i64 {
        if self.sender.uin == self_uin {
            self.target
        } else {
            self.sender.uin
        }
    }
}

/// A message in a temporary session opened through a shared group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempMessage {
    /// Protocol sequence number. `-1` signals a risk-controlled send.
    pub id: i32,
    /// Group through which the session was opened.
    pub group_code: i64,
    /// Group display name.
    pub group_name: String,
    /// Author.
    pub sender: Sender,
    /// Unix time in seconds.
    pub time: i64,
    /// Content.
    pub elements: Vec<Element>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_peer() {
        let mut message = PrivateMessage {
            id: 1,
            internal_id: 1,
            target: 100,
            sender: Sender {
                uin: 42,
                ..Default::default()
            },
            time: 0,
            elements: Vec::new(),
        };
        assert_eq!(message.peer(100), 42);

        message.sender.uin = 100;
        message.target = 42;
        assert_eq!(message.peer(100), 42);
    }
}

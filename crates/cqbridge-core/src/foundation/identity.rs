//! Global message identity.
//!
//! Messages from the protocol carry a sequence number that is only unique
//! within one conversation. Callers and the message store instead see a
//! 32-bit global id derived from the conversation scope and that sequence:
//!
//! ```text
//! global_id = crc32_ieee("{scope}-{local_seq}") as i32
//! ```
//!
//! The derivation is a pure function. Distinct inputs may collide; when they
//! do, the later record simply overwrites the earlier one in the store.

use flate2::Crc;

/// A global message id as returned to callers.
pub type MessageId = i32;

/// Derives the global message id for `local_seq` within `scope`.
///
/// `scope` is the group number for group messages and the peer user number
/// for private messages.
pub fn global_id(scope: i64, local_seq: i32) -> MessageId {
    let mut crc = Crc::new();
    crc.update(format!("{scope}-{local_seq}").as_bytes());
    crc.sum() as i32
}

/// Returns the big-endian store key for a global id.
pub fn store_key(id: MessageId) -> [u8; 4] {
    id.to_be_bytes()
}

//! Send pipeline.
//!
//! ```text
//! SendingMessage ─▶ resolve ─┬─ Action ─▶ perform ─▶ 0 | -1
//!                            ├─ Empty ──────────────▶ -1
//!                            └─ Ready ─▶ transmit ─┬─ ok ─▶ persist ─▶ global id
//!                                                  └─ failed ───────▶ -1
//! ```
//!
//! Private messages pick exactly one route, in priority order: contact,
//! temporary session, one-way relationship. Only applicability moves to the
//! next route; a failed send on the chosen route is final.

use cqbridge_core::{MessageId, Msg, global_id};
use tracing::{info, warn};

use crate::bot::CqBot;
use crate::client::{ClientError, ClientResult};
use crate::model::{GroupMessage, PrivateMessage, SendingMessage, to_cq_string};
use crate::resolver::{Channel, Resolution, ShortCircuit};

/// Returned when a standalone action was performed instead of a message.
pub const MESSAGE_ID_ACTION: MessageId = 0;

/// Returned when nothing was sent.
pub const MESSAGE_ID_FAILED: MessageId = -1;

/// Id reported by the client when the server dropped the message.
const RISK_CONTROLLED_ID: i32 = -1;

/// Route chosen for a private message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrivateRoute {
    Friend,
    Temp { group: i64 },
    OneWay,
}

impl CqBot {
    /// Sends `message` to `group`.
    ///
    /// Returns the global id of the sent message, [`MESSAGE_ID_ACTION`] if
    /// the message short-circuited to an action that succeeded, or
    /// [`MESSAGE_ID_FAILED`].
    pub async fn send_group_message(&self, group: i64, message: SendingMessage) -> MessageId {
        let elements = match self.resolver().resolve(Channel::Group(group), message).await {
            Resolution::Ready(elements) => elements,
            Resolution::Action(action) => return self.perform(action).await,
            Resolution::Empty => {
                warn!(group, "Group message not sent: message is empty");
                return MESSAGE_ID_FAILED;
            }
        };

        let sent = self
            .client
            .send_group_message(group, elements, self.options.force_fragmented)
            .await;
        match delivered(sent, |m| m.id) {
            Ok(message) => {
                let id = self.insert_group_message(&message).await;
                info!(group, id, "Sent group message");
                id
            }
            Err(ClientError::RiskControlled) => {
                warn!(group, "Group message not sent: rejected by risk control");
                MESSAGE_ID_FAILED
            }
            Err(e) => {
                warn!(group, error = %e, "Group message not sent");
                MESSAGE_ID_FAILED
            }
        }
    }

    /// Sends `message` to the user `target`.
    ///
    /// Temporary-session sends return the protocol-supplied id and are not
    /// archived. Return values otherwise match
    /// [`send_group_message`](Self::send_group_message).
    pub async fn send_private_message(&self, target: i64, message: SendingMessage) -> MessageId {
        let elements = match self.resolver().resolve(Channel::Private(target), message).await {
            Resolution::Ready(elements) => elements,
            Resolution::Action(action) => return self.perform(action).await,
            Resolution::Empty => {
                warn!(target, "Private message not sent: message is empty");
                return MESSAGE_ID_FAILED;
            }
        };

        let Some(route) = self.private_route(target) else {
            warn!(
                target,
                "Private message not sent: no contact, temporary session or one-way route"
            );
            return MESSAGE_ID_FAILED;
        };

        match route {
            PrivateRoute::Friend | PrivateRoute::OneWay => {
                let sent = self.client.send_private_message(target, elements).await;
                match delivered(sent, |m| m.id) {
                    Ok(message) => {
                        let id = self.insert_private_message(&message).await;
                        info!(target, id, ?route, "Sent private message");
                        id
                    }
                    Err(ClientError::RiskControlled) => {
                        warn!(target, ?route, "Private message not sent: rejected by risk control");
                        MESSAGE_ID_FAILED
                    }
                    Err(e) => {
                        warn!(target, ?route, error = %e, "Private message not sent");
                        MESSAGE_ID_FAILED
                    }
                }
            }
            PrivateRoute::Temp { group } => {
                let sent = self.client.send_temp_message(group, target, elements).await;
                match delivered(sent, |m| m.id) {
                    Ok(message) => {
                        info!(target, group, id = message.id, "Sent temporary message");
                        message.id
                    }
                    Err(ClientError::RiskControlled) => {
                        warn!(target, group, "Temporary message not sent: rejected by risk control");
                        MESSAGE_ID_FAILED
                    }
                    Err(e) => {
                        warn!(target, group, error = %e, "Temporary message not sent");
                        MESSAGE_ID_FAILED
                    }
                }
            }
        }
    }

    /// Archives a group message and returns its global id.
    ///
    /// The id is returned even if archiving fails; the failure is logged by
    /// the store.
    pub async fn insert_group_message(&self, message: &GroupMessage) -> MessageId {
        let id = global_id(message.group_code, message.id);
        let record = Msg::new()
            .with("message-id", message.id)
            .with("internal-id", message.internal_id)
            .with("group", message.group_code)
            .with("group-name", message.group_name.clone())
            .with("sender", serde_json::to_value(&message.sender).unwrap_or_default())
            .with("time", message.time)
            .with(
                "message",
                to_cq_string(&message.elements, message.group_code, true),
            );
        let _ = self.store.put(id, &record).await;
        id
    }

    /// Archives a private message and returns its global id.
    ///
    /// The scope code is the peer of the conversation, so a message and its
    /// reply share the same scope whichever side sent them.
    pub async fn insert_private_message(&self, message: &PrivateMessage) -> MessageId {
        let peer = message.peer(self.client.uin());
        let id = global_id(peer, message.id);
        let record = Msg::new()
            .with("message-id", message.id)
            .with("internal-id", message.internal_id)
            .with("target", message.target)
            .with("sender", serde_json::to_value(&message.sender).unwrap_or_default())
            .with("time", message.time)
            .with("message", to_cq_string(&message.elements, peer, true));
        let _ = self.store.put(id, &record).await;
        id
    }

    fn private_route(&self, target: i64) -> Option<PrivateRoute> {
        if self.client.find_friend(target).is_some() {
            return Some(PrivateRoute::Friend);
        }
        if let Some(group) = self.cache.temp_sessions.load(&target) {
            return Some(PrivateRoute::Temp { group });
        }
        if self.cache.one_way.contains(&target) {
            return Some(PrivateRoute::OneWay);
        }
        None
    }

    async fn perform(&self, action: ShortCircuit) -> MessageId {
        let name = action.name();
        match self.perform_action(&action).await {
            Ok(()) => {
                info!(action = name, "Performed message action");
                MESSAGE_ID_ACTION
            }
            Err(e) => {
                warn!(action = name, error = %e, "Message action failed");
                MESSAGE_ID_FAILED
            }
        }
    }

    async fn perform_action(&self, action: &ShortCircuit) -> ClientResult<()> {
        let client = self.client.as_ref();
        match action {
            ShortCircuit::GroupPoke { group, target } => {
                if client.find_group(*group).is_none() {
                    return Err(ClientError::GroupNotFound(*group));
                }
                if client.find_group_member(*group, *target).is_none() {
                    return Err(ClientError::MemberNotFound {
                        group: *group,
                        uin: *target,
                    });
                }
                client.group_member_poke(*group, *target).await
            }
            ShortCircuit::FriendPoke { target } => client.send_friend_poke(*target).await,
            ShortCircuit::Gift {
                group,
                target,
                gift_id,
            } => client.send_group_gift(*group, *target, *gift_id).await,
            ShortCircuit::GroupMusic { group, share } => {
                client.send_group_music_share(*group, share).await
            }
            ShortCircuit::PrivateMusic { target, share } => {
                client.send_private_music_share(*target, share).await
            }
        }
    }
}

/// Turns a send the server silently dropped into [`ClientError::RiskControlled`].
fn delivered<T>(sent: ClientResult<T>, id: impl FnOnce(&T) -> i32) -> ClientResult<T> {
    match sent {
        Ok(message) if id(&message) == RISK_CONTROLLED_ID => Err(ClientError::RiskControlled),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropped_send_is_risk_controlled() {
        let dropped: ClientResult<i32> = Ok(RISK_CONTROLLED_ID);
        assert!(matches!(
            delivered(dropped, |id| *id),
            Err(ClientError::RiskControlled)
        ));
        assert_eq!(delivered(Ok(7), |id| *id).unwrap(), 7);
        assert!(matches!(
            delivered(Err(ClientError::Offline), |id: &i32| *id),
            Err(ClientError::Offline)
        ));
    }
}

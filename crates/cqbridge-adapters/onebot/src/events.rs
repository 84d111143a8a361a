//! Inbound normalization.
//!
//! Converts [`InboundEvent`]s into dispatched [`Msg`] records. Along the way
//! the relationship caches are updated (so replies can find a route) and
//! messages are archived (so later replies and recalls can refer to them).
//!
//! | Event | `post_type` | Detail |
//! |-------|-------------|--------|
//! | private message | `message` / `message_sent` | `message_type=private`, `sub_type=friend` |
//! | temp message | `message` | `message_type=private`, `sub_type=group` |
//! | group message | `message` / `message_sent` | `message_type=group`, `sub_type=normal` / `anonymous` |
//! | friend request | `request` | `request_type=friend` |
//! | recalls | `notice` | `group_recall`, `friend_recall` |
//! | membership | `notice` | `friend_add`, `group_increase`, `group_decrease`, `group_ban` |

use cqbridge_core::{Msg, global_id};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bot::CqBot;
use crate::client::GroupMemberInfo;
use crate::model::{
    FriendAdded, FriendRecall, FriendRequest, GroupMessage, GroupMute, GroupRecall, InboundEvent,
    MemberChange, PrivateMessage, TempMessage, to_cq_string, to_formatted,
};

/// Error code carried by failure records produced during normalization.
const NORMALIZE_ERROR_CODE: i64 = 100;

impl CqBot {
    /// Normalizes `event` and dispatches the result.
    ///
    /// Returns the handles of the spawned subscriber tasks.
    pub async fn handle_event(&self, event: InboundEvent) -> Vec<JoinHandle<()>> {
        debug!(kind = event.kind(), "Handling inbound event");
        let normalized = match event {
            InboundEvent::PrivateMessage(m) => self.normalize_private_message(m).await,
            InboundEvent::GroupMessage(m) => self.normalize_group_message(m).await,
            InboundEvent::TempMessage(m) => self.normalize_temp_message(m),
            InboundEvent::FriendRequest(r) => self.normalize_friend_request(r),
            InboundEvent::GroupRecall(r) => self.normalize_group_recall(r),
            InboundEvent::FriendRecall(r) => self.normalize_friend_recall(r),
            InboundEvent::FriendAdded(f) => self.normalize_friend_added(f),
            InboundEvent::MemberJoined(c) => self.normalize_member_joined(c),
            InboundEvent::MemberLeft(c) => self.normalize_member_left(c),
            InboundEvent::GroupMute(m) => self.normalize_group_mute(m),
        };
        self.dispatch_event(normalized)
    }

    // ========================================================================
    // Messages
    // ========================================================================

    async fn normalize_private_message(&self, m: PrivateMessage) -> Msg {
        let self_id = self.self_id();
        let peer = m.peer(self_id);
        if !m.sender.is_friend && m.sender.uin != self_id {
            self.cache.one_way.store(m.sender.uin, ());
        }

        let raw = to_cq_string(&m.elements, peer, false);
        let id = self.insert_private_message(&m).await;
        info!(
            user = m.sender.uin,
            name = m.sender.display_name(),
            id,
            message = %raw,
            "Received private message"
        );

        Msg::new()
            .with("post_type", post_type(m.sender.uin, self_id))
            .with("message_type", "private")
            .with("sub_type", "friend")
            .with("message_id", id)
            .with("user_id", m.sender.uin)
            .with("target_id", m.target)
            .with("message", to_formatted(&m.elements, peer, self.options.post_format))
            .with("raw_message", raw)
            .with("font", 0)
            .with("self_id", self_id)
            .with("time", now())
            .with(
                "sender",
                json!({
                    "user_id": m.sender.uin,
                    "nickname": m.sender.nickname,
                    "sex": "unknown",
                    "age": 0,
                }),
            )
    }

    fn normalize_temp_message(&self, m: TempMessage) -> Msg {
        self.cache.temp_sessions.store(m.sender.uin, m.group_code);

        let raw = to_cq_string(&m.elements, m.sender.uin, false);
        info!(
            user = m.sender.uin,
            group = m.group_code,
            id = m.id,
            message = %raw,
            "Received temporary message"
        );

        Msg::new()
            .with("post_type", "message")
            .with("message_type", "private")
            .with("sub_type", "group")
            .with("message_id", m.id)
            .with("user_id", m.sender.uin)
            .with(
                "message",
                to_formatted(&m.elements, m.sender.uin, self.options.post_format),
            )
            .with("raw_message", raw)
            .with("font", 0)
            .with("self_id", self.self_id())
            .with("time", now())
            .with(
                "sender",
                json!({
                    "user_id": m.sender.uin,
                    "group_id": m.group_code,
                    "nickname": m.sender.nickname,
                    "sex": "unknown",
                    "age": 0,
                }),
            )
    }

    async fn normalize_group_message(&self, m: GroupMessage) -> Msg {
        let raw = to_cq_string(&m.elements, m.group_code, false);
        let id = self.insert_group_message(&m).await;
        info!(
            group = m.group_code,
            group_name = %m.group_name,
            user = m.sender.uin,
            name = m.sender.display_name(),
            id,
            message = %raw,
            "Received group message"
        );

        let mut event = self.format_group_message(&m, raw).await;
        event.insert("message_id", id);
        event
    }

    /// Builds the group message event, or a failure record if the sender
    /// cannot be resolved to a group member.
    async fn format_group_message(&self, m: &GroupMessage, raw: String) -> Msg {
        let self_id = self.self_id();
        let mut event = Msg::new()
            .with("post_type", post_type(m.sender.uin, self_id))
            .with("message_type", "group")
            .with("group_id", m.group_code)
            .with(
                "message",
                to_formatted(&m.elements, m.group_code, self.options.post_format),
            )
            .with("raw_message", raw)
            .with("font", 0)
            .with("self_id", self_id)
            .with("time", m.time);

        if let Some(anonymous) = &m.sender.anonymous {
            event.insert("sub_type", "anonymous");
            event.insert("user_id", 80000000);
            event.insert(
                "anonymous",
                json!({
                    "flag": format!("{}|{}", anonymous.anonymous_id, anonymous.anonymous_nick),
                    "id": m.sender.uin,
                    "name": anonymous.anonymous_nick,
                }),
            );
            event.insert(
                "sender",
                json!({
                    "user_id": 80000000,
                    "nickname": anonymous.anonymous_nick,
                    "card": "",
                    "role": "member",
                    "title": "",
                    "sex": "unknown",
                    "age": 0,
                }),
            );
            return event;
        }

        let member = match self.group_member(m.group_code, m.sender.uin).await {
            Ok(member) => member,
            Err(failure) => return failure,
        };

        event.insert("sub_type", "normal");
        event.insert("anonymous", Value::Null);
        event.insert("user_id", m.sender.uin);
        event.insert(
            "sender",
            json!({
                "user_id": m.sender.uin,
                "nickname": member.nickname,
                "card": member.card_name,
                "role": member.permission.as_role(),
                "title": member.special_title,
                "sex": "unknown",
                "age": 0,
            }),
        );
        event
    }

    /// Looks up a member, refreshing the member list once on a cache miss.
    async fn group_member(&self, group: i64, uin: i64) -> Result<GroupMemberInfo, Msg> {
        if let Some(member) = self.client.find_group_member(group, uin) {
            return Ok(member);
        }

        debug!(group, uin, "Member not cached, refreshing member list");
        let members = self.client.refresh_group_members(group).await.map_err(|e| {
            warn!(group, error = %e, "Failed to refresh group members");
            Msg::failed(NORMALIZE_ERROR_CODE, "GET_MEMBERS_API_ERROR", e.to_string())
        })?;

        members
            .into_iter()
            .find(|member| member.uin == uin)
            .ok_or_else(|| {
                warn!(group, uin, "Sender is not a member of the group");
                Msg::failed(NORMALIZE_ERROR_CODE, "MEMBER_NOT_FOUND", "群员不存在")
            })
    }

    // ========================================================================
    // Requests
    // ========================================================================

    fn normalize_friend_request(&self, r: FriendRequest) -> Msg {
        let flag = r.flag();
        self.cache.friend_requests.store(r.requester_uin, flag.clone());
        info!(
            user = r.requester_uin,
            name = %r.requester_nick,
            comment = %r.message,
            "Received contact request"
        );

        Msg::new()
            .with("post_type", "request")
            .with("request_type", "friend")
            .with("user_id", r.requester_uin)
            .with("comment", r.message)
            .with("flag", flag)
            .with("self_id", self.self_id())
            .with("time", now())
    }

    // ========================================================================
    // Notices
    // ========================================================================

    fn normalize_group_recall(&self, r: GroupRecall) -> Msg {
        let id = global_id(r.group_code, r.message_id);
        info!(group = r.group_code, operator = r.operator_uin, id, "Group message recalled");
        self.notice("group_recall")
            .with("group_id", r.group_code)
            .with("user_id", r.author_uin)
            .with("operator_id", r.operator_uin)
            .with("message_id", id)
            .with("time", r.time)
    }

    fn normalize_friend_recall(&self, r: FriendRecall) -> Msg {
        let id = global_id(r.friend_uin, r.message_id);
        info!(user = r.friend_uin, id, "Private message recalled");
        self.notice("friend_recall")
            .with("user_id", r.friend_uin)
            .with("message_id", id)
            .with("time", r.time)
    }

    fn normalize_friend_added(&self, f: FriendAdded) -> Msg {
        info!(user = f.uin, name = %f.nickname, "Contact added");
        self.cache.one_way.delete(&f.uin);
        self.notice("friend_add").with("user_id", f.uin).with("time", now())
    }

    fn normalize_member_joined(&self, c: MemberChange) -> Msg {
        info!(group = c.group_code, user = c.member_uin, "Member joined group");
        let sub_type = if c.operator_uin.is_some() { "invite" } else { "approve" };
        self.notice("group_increase")
            .with("sub_type", sub_type)
            .with("group_id", c.group_code)
            .with("user_id", c.member_uin)
            .with("operator_id", c.operator_uin.unwrap_or(0))
            .with("time", now())
    }

    fn normalize_member_left(&self, c: MemberChange) -> Msg {
        info!(group = c.group_code, user = c.member_uin, "Member left group");
        let sub_type = match c.operator_uin {
            None => "leave",
            Some(_) if c.member_uin == self.self_id() => "kick_me",
            Some(_) => "kick",
        };
        self.notice("group_decrease")
            .with("sub_type", sub_type)
            .with("group_id", c.group_code)
            .with("user_id", c.member_uin)
            .with("operator_id", c.operator_uin.unwrap_or(c.member_uin))
            .with("time", now())
    }

    fn normalize_group_mute(&self, m: GroupMute) -> Msg {
        info!(
            group = m.group_code,
            operator = m.operator_uin,
            target = m.target_uin,
            duration = m.duration,
            "Group mute changed"
        );
        let sub_type = if m.duration > 0 { "ban" } else { "lift_ban" };
        self.notice("group_ban")
            .with("sub_type", sub_type)
            .with("group_id", m.group_code)
            .with("operator_id", m.operator_uin)
            .with("user_id", m.target_uin)
            .with("duration", m.duration)
            .with("time", now())
    }

    fn notice(&self, notice_type: &str) -> Msg {
        Msg::new()
            .with("post_type", "notice")
            .with("notice_type", notice_type)
            .with("self_id", self.self_id())
    }
}

fn post_type(sender: i64, self_id: i64) -> &'static str {
    if sender == self_id {
        "message_sent"
    } else {
        "message"
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

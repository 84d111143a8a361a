//! Shared test harness: a scripted protocol client that records every call.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cqbridge_adapter_onebot::{
    BotOptions, ClientError, ClientResult, ClientStatistics, CqBot, Element, FriendInfo,
    GroupInfo, GroupMemberInfo, GroupMessage, MemberPermission, MusicShare, PrivateMessage,
    ProtocolClient, Sender, TempMessage,
};
use cqbridge_core::{MemoryKvStore, MessageStore, Msg};
use parking_lot::Mutex;

pub const SELF_ID: i64 = 100;

/// A recorded client call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UploadGroupImage(i64),
    UploadPrivateImage(i64),
    UploadVideo(i64),
    UploadVoice(i64),
    SendGroup {
        group: i64,
        elements: Vec<Element>,
        force_fragmented: bool,
    },
    SendPrivate {
        target: i64,
        elements: Vec<Element>,
    },
    SendTemp {
        group: i64,
        target: i64,
        elements: Vec<Element>,
    },
    Gift(i64, i64, u32),
    GroupMusic(i64),
    PrivateMusic(i64),
    FriendPoke(i64),
    GroupPoke(i64, i64),
    RefreshMembers(i64),
}

/// Scripted protocol client.
#[derive(Default)]
pub struct MockClient {
    pub calls: Mutex<Vec<Call>>,
    pub friends: Mutex<HashMap<i64, FriendInfo>>,
    pub members: Mutex<HashMap<(i64, i64), GroupMemberInfo>>,
    /// Groups the client does not know about; every other group exists.
    pub missing_groups: Mutex<HashSet<i64>>,
    /// Members returned by the next refresh; `None` makes the refresh fail.
    pub refreshed_members: Mutex<Option<Vec<GroupMemberInfo>>>,
    pub fail_uploads: Mutex<bool>,
    pub fail_sends: Mutex<bool>,
    pub risk_controlled: Mutex<bool>,
    next_seq: Mutex<i32>,
}

impl MockClient {
    pub fn new() -> Arc<Self> {
        let client = Self::default();
        *client.next_seq.lock() = 1;
        Arc::new(client)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn add_friend(&self, uin: i64) {
        self.friends.lock().insert(
            uin,
            FriendInfo {
                uin,
                nickname: format!("friend-{uin}"),
                remark: String::new(),
            },
        );
    }

    pub fn add_member(&self, group: i64, uin: i64, permission: MemberPermission) {
        self.members.lock().insert((group, uin), member(group, uin, permission));
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn next_id(&self) -> i32 {
        if *self.risk_controlled.lock() {
            return -1;
        }
        let mut seq = self.next_seq.lock();
        let id = *seq;
        *seq += 1;
        id
    }

    fn upload_result(&self, name: &str) -> ClientResult<Element> {
        if *self.fail_uploads.lock() {
            return Err(ClientError::upload("server refused"));
        }
        Ok(Element::GroupImage {
            image_id: format!("{name}.jpg"),
            url: None,
        })
    }

    fn send_result(&self) -> ClientResult<()> {
        if *self.fail_sends.lock() {
            return Err(ClientError::send("network down"));
        }
        Ok(())
    }
}

pub fn member(group: i64, uin: i64, permission: MemberPermission) -> GroupMemberInfo {
    GroupMemberInfo {
        group_code: group,
        uin,
        nickname: format!("user-{uin}"),
        card_name: format!("card-{uin}"),
        special_title: String::new(),
        level: 1,
        join_time: 0,
        last_speak_time: 0,
        permission,
    }
}

#[async_trait]
impl ProtocolClient for MockClient {
    fn uin(&self) -> i64 {
        SELF_ID
    }

    fn is_online(&self) -> bool {
        true
    }

    fn statistics(&self) -> ClientStatistics {
        ClientStatistics {
            message_sent: 3,
            ..Default::default()
        }
    }

    fn find_group(&self, group: i64) -> Option<GroupInfo> {
        if self.missing_groups.lock().contains(&group) {
            return None;
        }
        Some(GroupInfo {
            code: group,
            name: format!("group-{group}"),
            member_count: 0,
        })
    }

    fn find_group_member(&self, group: i64, uin: i64) -> Option<GroupMemberInfo> {
        self.members.lock().get(&(group, uin)).cloned()
    }

    fn find_friend(&self, uin: i64) -> Option<FriendInfo> {
        self.friends.lock().get(&uin).cloned()
    }

    async fn refresh_group_members(&self, group: i64) -> ClientResult<Vec<GroupMemberInfo>> {
        self.record(Call::RefreshMembers(group));
        let refreshed = self.refreshed_members.lock().clone();
        match refreshed {
            Some(members) => {
                let mut cache = self.members.lock();
                for m in &members {
                    cache.insert((m.group_code, m.uin), m.clone());
                }
                Ok(members)
            }
            None => Err(ClientError::send("member list unavailable")),
        }
    }

    async fn upload_group_image(&self, group: i64, _data: Vec<u8>) -> ClientResult<Element> {
        self.record(Call::UploadGroupImage(group));
        self.upload_result("group")
    }

    async fn upload_group_image_by_file(&self, group: i64, _path: &Path) -> ClientResult<Element> {
        self.record(Call::UploadGroupImage(group));
        self.upload_result("group-file")
    }

    async fn upload_private_image(&self, target: i64, _data: Vec<u8>) -> ClientResult<Element> {
        self.record(Call::UploadPrivateImage(target));
        if *self.fail_uploads.lock() {
            return Err(ClientError::upload("server refused"));
        }
        Ok(Element::FriendImage {
            image_id: "private.jpg".into(),
            url: None,
        })
    }

    async fn upload_group_short_video(
        &self,
        target: i64,
        _video: Vec<u8>,
        _thumb: Vec<u8>,
        _cache_file: &Path,
    ) -> ClientResult<Element> {
        self.record(Call::UploadVideo(target));
        if *self.fail_uploads.lock() {
            return Err(ClientError::upload("server refused"));
        }
        Ok(Element::ShortVideo {
            name: "clip.mp4".into(),
            uuid: "uuid".into(),
            size: 5,
        })
    }

    async fn upload_group_voice(&self, group: i64, _data: Vec<u8>) -> ClientResult<Element> {
        self.record(Call::UploadVoice(group));
        self.upload_result("voice")
    }

    async fn upload_private_voice(&self, target: i64, _data: Vec<u8>) -> ClientResult<Element> {
        self.record(Call::UploadVoice(target));
        self.upload_result("voice")
    }

    async fn send_group_message(
        &self,
        group: i64,
        elements: Vec<Element>,
        force_fragmented: bool,
    ) -> ClientResult<GroupMessage> {
        self.record(Call::SendGroup {
            group,
            elements: elements.clone(),
            force_fragmented,
        });
        self.send_result()?;
        Ok(GroupMessage {
            id: self.next_id(),
            internal_id: 9,
            group_code: group,
            group_name: format!("group-{group}"),
            sender: Sender {
                uin: SELF_ID,
                nickname: "bot".into(),
                ..Default::default()
            },
            time: 1_700_000_000,
            elements,
        })
    }

    async fn send_private_message(
        &self,
        target: i64,
        elements: Vec<Element>,
    ) -> ClientResult<PrivateMessage> {
        self.record(Call::SendPrivate {
            target,
            elements: elements.clone(),
        });
        self.send_result()?;
        Ok(PrivateMessage {
            id: self.next_id(),
            internal_id: 9,
            target,
            sender: Sender {
                uin: SELF_ID,
                nickname: "bot".into(),
                ..Default::default()
            },
            time: 1_700_000_000,
            elements,
        })
    }

    async fn send_temp_message(
        &self,
        group: i64,
        target: i64,
        elements: Vec<Element>,
    ) -> ClientResult<TempMessage> {
        self.record(Call::SendTemp {
            group,
            target,
            elements: elements.clone(),
        });
        self.send_result()?;
        Ok(TempMessage {
            id: self.next_id(),
            group_code: group,
            group_name: format!("group-{group}"),
            sender: Sender {
                uin: SELF_ID,
                ..Default::default()
            },
            time: 1_700_000_000,
            elements,
        })
    }

    async fn send_group_gift(&self, group: i64, target: i64, gift_id: u32) -> ClientResult<()> {
        self.record(Call::Gift(group, target, gift_id));
        self.send_result()
    }

    async fn send_group_music_share(&self, group: i64, _share: &MusicShare) -> ClientResult<()> {
        self.record(Call::GroupMusic(group));
        self.send_result()
    }

    async fn send_private_music_share(&self, target: i64, _share: &MusicShare) -> ClientResult<()> {
        self.record(Call::PrivateMusic(target));
        self.send_result()
    }

    async fn send_friend_poke(&self, target: i64) -> ClientResult<()> {
        self.record(Call::FriendPoke(target));
        self.send_result()
    }

    async fn group_member_poke(&self, group: i64, target: i64) -> ClientResult<()> {
        self.record(Call::GroupPoke(group, target));
        self.send_result()
    }
}

/// Options with the heartbeat disabled so tests see only their own events.
pub fn quiet_options() -> BotOptions {
    BotOptions {
        heartbeat_interval: 0,
        ..Default::default()
    }
}

/// Builds a bot over `client` with an in-memory store.
pub fn bot_with_store(client: &Arc<MockClient>) -> (CqBot, Arc<MemoryKvStore>) {
    let backend = Arc::new(MemoryKvStore::new());
    let bot = CqBot::new(
        client.clone(),
        MessageStore::new(backend.clone()),
        quiet_options(),
    );
    (bot, backend)
}

/// Registers a subscriber collecting every dispatched event.
pub fn collect_events(bot: &CqBot) -> Arc<Mutex<Vec<Msg>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    bot.on_event_push(move |event| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().push((*event).clone());
        }
    });
    events
}

pub fn music() -> MusicShare {
    MusicShare {
        kind: cqbridge_adapter_onebot::MusicKind::Cloud163,
        title: "song".into(),
        summary: "artist".into(),
        brief: String::new(),
        url: "https://music.example/1".into(),
        picture_url: String::new(),
        music_url: "https://music.example/1.mp3".into(),
    }
}

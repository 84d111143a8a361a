//! Integration tests for the bridge runtime: store wiring, filter loading and
//! the event pump.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cqbridge_adapter_onebot::{
    BotOptions, ClientError, ClientResult, ClientStatistics, CqBot, Element, FriendAdded,
    FriendInfo, FriendRequest, GroupInfo, GroupMemberInfo, GroupMessage, InboundEvent,
    MusicShare, PrivateMessage, ProtocolClient, Sender, TempMessage,
};
use cqbridge_core::{Msg, global_id};
use cqbridge_runtime::config::{BridgeConfig, ConfigError};
use cqbridge_runtime::{BridgeRuntime, RuntimeError, SHUTDOWN_GRACE};
use tokio::sync::mpsc;

const SELF_ID: i64 = 42;

/// A client that is online but knows nobody and cannot send.
struct IdleClient;

#[async_trait]
impl ProtocolClient for IdleClient {
    fn uin(&self) -> i64 {
        SELF_ID
    }

    fn is_online(&self) -> bool {
        true
    }

    fn statistics(&self) -> ClientStatistics {
        ClientStatistics::default()
    }

    fn find_group(&self, _group: i64) -> Option<GroupInfo> {
        None
    }

    fn find_group_member(&self, _group: i64, _uin: i64) -> Option<GroupMemberInfo> {
        None
    }

    fn find_friend(&self, _uin: i64) -> Option<FriendInfo> {
        None
    }

    async fn refresh_group_members(&self, _group: i64) -> ClientResult<Vec<GroupMemberInfo>> {
        Err(ClientError::Offline)
    }

    async fn upload_group_image(&self, _group: i64, _data: Vec<u8>) -> ClientResult<Element> {
        Err(ClientError::Offline)
    }

    async fn upload_group_image_by_file(
        &self,
        _group: i64,
        _path: &Path,
    ) -> ClientResult<Element> {
        Err(ClientError::Offline)
    }

    async fn upload_private_image(&self, _target: i64, _data: Vec<u8>) -> ClientResult<Element> {
        Err(ClientError::Offline)
    }

    async fn upload_group_short_video(
        &self,
        _target: i64,
        _video: Vec<u8>,
        _thumb: Vec<u8>,
        _cache_file: &Path,
    ) -> ClientResult<Element> {
        Err(ClientError::Offline)
    }

    async fn upload_group_voice(&self, _group: i64, _data: Vec<u8>) -> ClientResult<Element> {
        Err(ClientError::Offline)
    }

    async fn upload_private_voice(&self, _target: i64, _data: Vec<u8>) -> ClientResult<Element> {
        Err(ClientError::Offline)
    }

    async fn send_group_message(
        &self,
        _group: i64,
        _elements: Vec<Element>,
        _force_fragmented: bool,
    ) -> ClientResult<GroupMessage> {
        Err(ClientError::Offline)
    }

    async fn send_private_message(
        &self,
        _target: i64,
        _elements: Vec<Element>,
    ) -> ClientResult<PrivateMessage> {
        Err(ClientError::Offline)
    }

    async fn send_temp_message(
        &self,
        _group: i64,
        _target: i64,
        _elements: Vec<Element>,
    ) -> ClientResult<TempMessage> {
        Err(ClientError::Offline)
    }

    async fn send_group_gift(&self, _group: i64, _target: i64, _gift_id: u32) -> ClientResult<()> {
        Err(ClientError::Offline)
    }

    async fn send_group_music_share(&self, _group: i64, _share: &MusicShare) -> ClientResult<()> {
        Err(ClientError::Offline)
    }

    async fn send_private_music_share(
        &self,
        _target: i64,
        _share: &MusicShare,
    ) -> ClientResult<()> {
        Err(ClientError::Offline)
    }

    async fn send_friend_poke(&self, _target: i64) -> ClientResult<()> {
        Err(ClientError::Offline)
    }

    async fn group_member_poke(&self, _group: i64, _target: i64) -> ClientResult<()> {
        Err(ClientError::Offline)
    }
}

fn test_config(dir: &Path) -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.database.path = dir.join("data").join("messages.db");
    config.bot = BotOptions {
        heartbeat_interval: 0,
        cache_dir: dir.join("cache"),
        ..Default::default()
    };
    config
}

fn collect(bot: &CqBot) -> Arc<Mutex<Vec<Msg>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    bot.on_event_push(move |event| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().unwrap().push((*event).clone());
        }
    });
    events
}

fn stranger_message(id: i32, from: i64) -> InboundEvent {
    InboundEvent::PrivateMessage(PrivateMessage {
        id,
        internal_id: id,
        target: SELF_ID,
        sender: Sender {
            uin: from,
            nickname: "stranger".to_string(),
            ..Default::default()
        },
        time: 1_700_000_000,
        elements: vec![Element::text("hello")],
    })
}

#[tokio::test]
async fn test_events_flow_until_source_closes() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = BridgeRuntime::from_config(test_config(dir.path())).unwrap();
    let bot = runtime.start(Arc::new(IdleClient)).unwrap();
    let events = collect(&bot);

    let (tx, rx) = mpsc::channel(8);
    tx.send(InboundEvent::FriendAdded(FriendAdded {
        uin: 7,
        nickname: "seven".to_string(),
    }))
    .await
    .unwrap();
    tx.send(InboundEvent::FriendRequest(FriendRequest {
        request_id: 99,
        requester_uin: 8,
        requester_nick: "eight".to_string(),
        message: "hi".to_string(),
    }))
    .await
    .unwrap();
    drop(tx);

    runtime
        .run_until(Arc::clone(&bot), rx, std::future::pending())
        .await;

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert!(
        events
            .iter()
            .any(|e| e.get_str("notice_type") == Some("friend_add"))
    );
    assert!(
        events
            .iter()
            .any(|e| e.get_str("request_type") == Some("friend"))
    );
    assert_eq!(bot.cache().friend_requests.load(&8), Some("99".to_string()));
    assert!(bot.is_released());
}

#[tokio::test]
async fn test_messages_persist_to_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let db_path = config.database.path.clone();
    let runtime = BridgeRuntime::from_config(config).unwrap();
    let bot = runtime.start(Arc::new(IdleClient)).unwrap();
    assert!(bot.store().is_enabled());
    assert!(db_path.exists());
    assert!(dir.path().join("cache").is_dir());

    let handles = bot.handle_event(stranger_message(3, 555)).await;
    for handle in handles {
        handle.await.unwrap();
    }

    let record = bot.get_message(global_id(555, 3)).await.unwrap();
    assert_eq!(record.get_msg("sender").unwrap().get_i64("uin"), Some(555));
    assert_eq!(record.get_str("message"), Some("hello"));
    assert!(bot.cache().one_way.contains(&555));
    bot.release();
}

#[tokio::test]
async fn test_disabled_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.database.enabled = false;
    let runtime = BridgeRuntime::from_config(config).unwrap();

    let store = runtime.open_store().unwrap();
    assert!(!store.is_enabled());
    assert!(!dir.path().join("data").exists());
}

#[tokio::test]
async fn test_unopenable_database_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let mut config = test_config(dir.path());
    config.database.path = blocker.join("messages.db");
    let runtime = BridgeRuntime::from_config(config).unwrap();

    assert!(matches!(
        runtime.start(Arc::new(IdleClient)),
        Err(RuntimeError::Store(_))
    ));
}

#[tokio::test]
async fn test_filter_file_applies_to_bot() {
    let dir = tempfile::tempdir().unwrap();
    let filter_path = dir.path().join("filter.json");
    std::fs::write(&filter_path, r#"{"post_type": {".neq": "notice"}}"#).unwrap();

    let mut config = test_config(dir.path());
    config.filter.path = Some(filter_path);
    let runtime = BridgeRuntime::from_config(config).unwrap();
    assert!(runtime.filter().is_some());

    let bot = runtime.start(Arc::new(IdleClient)).unwrap();
    let events = collect(&bot);

    let (tx, rx) = mpsc::channel(8);
    tx.send(InboundEvent::FriendAdded(FriendAdded {
        uin: 7,
        nickname: String::new(),
    }))
    .await
    .unwrap();
    tx.send(stranger_message(1, 600)).await.unwrap();
    drop(tx);

    runtime
        .run_until(Arc::clone(&bot), rx, std::future::pending())
        .await;

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].get_str("post_type"), Some("message"));
}

#[test]
fn test_malformed_filter_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let filter_path = dir.path().join("filter.json");
    std::fs::write(&filter_path, r#"{"post_type": {".bogus": 1}}"#).unwrap();

    let mut config = test_config(dir.path());
    config.filter.path = Some(filter_path);

    assert!(matches!(
        BridgeRuntime::from_config(config),
        Err(RuntimeError::Config(ConfigError::InvalidFilter { .. }))
    ));
}

#[test]
fn test_builder_reads_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cqbridge.toml");
    let cache_dir: PathBuf = dir.path().join("cache");
    std::fs::write(
        &path,
        format!(
            "[database]\nenabled = false\n\n[bot]\nheartbeat_interval = 0\ncache_dir = {:?}\n",
            cache_dir.display().to_string()
        ),
    )
    .unwrap();

    let runtime = BridgeRuntime::builder()
        .config_file(&path)
        .without_env()
        .build()
        .unwrap();
    assert!(!runtime.config().database.enabled);
    assert_eq!(runtime.config().bot.heartbeat_interval, 0);
    assert_eq!(runtime.config().bot.cache_dir, cache_dir);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_future_stops_pump() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = BridgeRuntime::from_config(test_config(dir.path())).unwrap();
    let bot = runtime.start(Arc::new(IdleClient)).unwrap();

    let (tx, rx) = mpsc::channel::<InboundEvent>(8);
    runtime
        .run_until(
            Arc::clone(&bot),
            rx,
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await;

    assert!(bot.is_released());
    assert!(tx.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_hung_subscriber_does_not_block_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = BridgeRuntime::from_config(test_config(dir.path())).unwrap();
    let bot = runtime.start(Arc::new(IdleClient)).unwrap();
    bot.on_event_push(|_| std::future::pending::<()>());
    let events = collect(&bot);

    let (tx, rx) = mpsc::channel(8);
    tx.send(stranger_message(1, 700)).await.unwrap();

    let finished = tokio::time::timeout(
        SHUTDOWN_GRACE * 4,
        runtime.run_until(
            Arc::clone(&bot),
            rx,
            tokio::time::sleep(Duration::from_millis(100)),
        ),
    )
    .await;

    assert!(finished.is_ok());
    assert!(bot.is_released());
    assert_eq!(events.lock().unwrap().len(), 1);
    drop(tx);
}

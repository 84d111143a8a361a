//! The mediating bot.
//!
//! [`CqBot`] ties a [`ProtocolClient`] to the rest of cqbridge. It owns the
//! message store, the relationship caches, the event dispatcher and the
//! heartbeat. Sending lives in [`send`](crate::send) and inbound
//! normalization in [`events`](crate::events); both are methods on
//! `CqBot`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cqbridge_adapter_onebot::{BotOptions, CqBot, SendingMessage};
//! use cqbridge_core::MessageStore;
//!
//! let bot = CqBot::new(client, MessageStore::disabled(), BotOptions::default());
//! bot.on_event_push(|event| async move {
//!     tracing::info!(event = %event.to_json(), "event");
//! });
//! let id = bot.send_group_message(10001, SendingMessage::new().text("hello")).await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cqbridge_core::{EventDispatcher, EventFilter, Heartbeat, MessageId, MessageStore, Msg};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RelationshipCache;
use crate::client::ProtocolClient;
use crate::config::BotOptions;
use crate::resolver::OutboundResolver;

/// A bot mediating between one protocol client and its subscribers.
pub struct CqBot {
    pub(crate) client: Arc<dyn ProtocolClient>,
    pub(crate) dispatcher: Arc<EventDispatcher>,
    pub(crate) store: MessageStore,
    pub(crate) cache: RelationshipCache,
    pub(crate) options: BotOptions,
    heartbeat: Mutex<Option<Heartbeat>>,
    released: AtomicBool,
}

impl CqBot {
    /// Creates a bot and starts its heartbeat.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(client: Arc<dyn ProtocolClient>, store: MessageStore, options: BotOptions) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());

        let heartbeat_client = Arc::clone(&client);
        let heartbeat = Heartbeat::start(
            options.heartbeat_interval,
            Arc::clone(&dispatcher),
            move |interval| heartbeat_event(heartbeat_client.as_ref(), interval),
        );

        info!(
            self_id = client.uin(),
            persistence = store.is_enabled(),
            post_format = ?options.post_format,
            "Bot created"
        );

        Self {
            client,
            dispatcher,
            store,
            cache: RelationshipCache::new(),
            options,
            heartbeat: Mutex::new(heartbeat),
            released: AtomicBool::new(false),
        }
    }

    /// Returns the protocol client.
    pub fn client(&self) -> &Arc<dyn ProtocolClient> {
        &self.client
    }

    /// Returns the account's user number.
    pub fn self_id(&self) -> i64 {
        self.client.uin()
    }

    /// Returns the bot options.
    pub fn options(&self) -> &BotOptions {
        &self.options
    }

    /// Returns the relationship caches.
    pub fn cache(&self) -> &RelationshipCache {
        &self.cache
    }

    /// Returns the message store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Returns the event dispatcher.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Registers an event subscriber.
    pub fn on_event_push<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<Msg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher.register(handler);
    }

    /// Installs or removes the event filter.
    pub fn set_event_filter(&self, filter: Option<Arc<dyn EventFilter>>) {
        self.dispatcher.set_filter(filter);
    }

    /// Dispatches `event` to every subscriber.
    pub fn dispatch_event(&self, event: Msg) -> Vec<JoinHandle<()>> {
        self.dispatcher.dispatch(event)
    }

    /// Loads the archived record of a message by global id.
    pub async fn get_message(&self, id: MessageId) -> Option<Msg> {
        self.store.get(id).await
    }

    /// Returns a status snapshot of the bot and its client.
    pub fn status(&self) -> Msg {
        status_snapshot(self.client.as_ref())
    }

    /// Stops the heartbeat and closes the message store. Idempotent.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(heartbeat) = self.heartbeat.lock().take() {
            heartbeat.stop();
        }
        self.store.close();
        debug!(self_id = self.client.uin(), "Bot released");
    }

    /// Returns `true` once [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn resolver(&self) -> OutboundResolver<'_> {
        OutboundResolver::new(self.client.as_ref(), &self.options.cache_dir)
    }
}

impl Drop for CqBot {
    fn drop(&mut self) {
        if let Some(heartbeat) = self.heartbeat.get_mut().take() {
            heartbeat.stop();
        }
    }
}

impl std::fmt::Debug for CqBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CqBot")
            .field("self_id", &self.client.uin())
            .field("store", &self.store)
            .field("options", &self.options)
            .field("released", &self.is_released())
            .finish()
    }
}

/// Builds the status snapshot reported by the heartbeat.
pub fn status_snapshot(client: &dyn ProtocolClient) -> Msg {
    let online = client.is_online();
    Msg::new()
        .with("app_initialized", true)
        .with("app_enabled", true)
        .with("plugins_good", Value::Null)
        .with("app_good", true)
        .with("online", online)
        .with("good", online)
        .with(
            "stat",
            serde_json::to_value(client.statistics()).unwrap_or_default(),
        )
}

fn heartbeat_event(client: &dyn ProtocolClient, interval: Duration) -> Msg {
    Msg::new()
        .with("time", chrono::Utc::now().timestamp())
        .with("self_id", client.uin())
        .with("post_type", "meta_event")
        .with("meta_event_type", "heartbeat")
        .with("status", status_snapshot(client))
        .with("interval", interval.as_millis() as u64)
}

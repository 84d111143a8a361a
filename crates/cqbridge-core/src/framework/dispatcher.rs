//! Event dispatcher.
//!
//! The [`EventDispatcher`] delivers every normalized event to every
//! registered subscriber. Unlike a matcher chain there is no ordering and no
//! blocking: each handler runs in its own task so that
//!
//! 1. a handler that panics never affects its siblings or the caller,
//! 2. a slow handler never delays the others,
//! 3. handlers slower than [`SLOW_HANDLER_THRESHOLD`] are reported but left running.
//!
//! ```rust,ignore
//! use cqbridge_core::EventDispatcher;
//!
//! let dispatcher = EventDispatcher::new();
//! dispatcher.register(|event| async move {
//!     tracing::info!(event = %event.to_json(), "received");
//! });
//! dispatcher.dispatch(event);
//! ```

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{Level, debug, span, warn};

use crate::foundation::msg::Msg;
use crate::framework::filter::EventFilter;

/// Handlers running longer than this are logged as blocking.
pub const SLOW_HANDLER_THRESHOLD: Duration = Duration::from_secs(5);

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// A type-erased subscriber.
pub type EventHandler = Arc<dyn Fn(Arc<Msg>) -> BoxFuture<'static, ()> + Send + Sync>;

/// The central fan-out point for normalized events.
///
/// # Thread Safety
///
/// `EventDispatcher` is `Send + Sync`; registration and dispatch may happen
/// from any task. Handlers are expected to be registered before steady-state
/// event flow begins.
pub struct EventDispatcher {
    /// Registered subscribers, in registration order.
    handlers: RwLock<Vec<EventHandler>>,
    /// Optional predicate deciding whether an event is delivered.
    filter: RwLock<Option<Arc<dyn EventFilter>>>,
    /// Duration after which a handler is reported as blocking.
    slow_threshold: Duration,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no handlers and no filter.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            filter: RwLock::new(None),
            slow_threshold: SLOW_HANDLER_THRESHOLD,
        }
    }

    /// Overrides the blocking-handler threshold (builder pattern).
    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }

    /// Registers an async subscriber.
    pub fn register<F, Fut>(&self, handler: F)
    where
        F: Fn(Arc<Msg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_handler(Arc::new(move |event| Box::pin(handler(event))));
    }

    /// Registers an already type-erased subscriber.
    pub fn register_handler(&self, handler: EventHandler) {
        self.handlers.write().push(handler);
    }

    /// Installs or removes the event filter.
    pub fn set_filter(&self, filter: Option<Arc<dyn EventFilter>>) {
        *self.filter.write() = filter;
    }

    /// Returns the number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Dispatches an event to all registered handlers.
    ///
    /// Returns immediately with one handle per spawned supervisor task; the
    /// handles never resolve to an error because handler panics are caught
    /// inside the supervisor. Must be called within a Tokio runtime.
    pub fn dispatch(&self, event: Msg) -> Vec<JoinHandle<()>> {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            post_type = event.get_str("post_type").unwrap_or("unknown")
        );
        let _enter = span.enter();

        let filter = self.filter.read().clone();
        if let Some(filter) = filter
            && !filter.eval(&event)
        {
            debug!("Event filtered");
            return Vec::new();
        }

        let handlers = self.handlers.read().clone();
        let event = Arc::new(event);
        handlers
            .into_iter()
            .enumerate()
            .map(|(index, handler)| {
                tokio::spawn(supervise(
                    index,
                    handler,
                    Arc::clone(&event),
                    self.slow_threshold,
                ))
            })
            .collect()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("handler_count", &self.handler_count())
            .field("has_filter", &self.filter.read().is_some())
            .field("slow_threshold", &self.slow_threshold)
            .finish()
    }
}

/// Runs one handler in a nested task, reporting panics and slow completions.
async fn supervise(index: usize, handler: EventHandler, event: Arc<Msg>, threshold: Duration) {
    let start = Instant::now();
    let task_event = Arc::clone(&event);
    let result = tokio::spawn(async move { handler(task_event).await }).await;
    let elapsed = start.elapsed();

    if let Err(err) = result {
        if err.is_panic() {
            let payload = err.into_panic();
            warn!(
                handler = index,
                event = %event.to_json(),
                reason = panic_message(payload.as_ref()),
                "Event handler panicked"
            );
        } else {
            warn!(handler = index, "Event handler task was cancelled");
        }
    }

    if elapsed > threshold {
        warn!(
            handler = index,
            elapsed = ?elapsed,
            "Event handler took longer than {threshold:?}, check the subscriber for blocking work"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("unknown cause")
}

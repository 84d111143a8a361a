//! Periodic heartbeat meta events.
//!
//! The heartbeat is a repeating task that builds a fresh event on every tick
//! and feeds it through [`EventDispatcher::dispatch`], exactly like inbound
//! events. It is stopped through a [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::foundation::msg::Msg;
use crate::framework::dispatcher::EventDispatcher;

/// Handle to a running heartbeat task.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Starts a heartbeat ticking every `interval_secs` seconds.
    ///
    /// A non-positive interval, or one too large to schedule, disables the
    /// heartbeat and returns `None`.
    /// The first event is dispatched one full interval after start.
    pub fn start<F>(
        interval_secs: i64,
        dispatcher: Arc<EventDispatcher>,
        make_event: F,
    ) -> Option<Self>
    where
        F: Fn(Duration) -> Msg + Send + Sync + 'static,
    {
        if interval_secs <= 0 {
            warn!("Heartbeat is disabled; check the configuration if this is unexpected");
            return None;
        }

        let interval = Duration::from_secs(interval_secs.unsigned_abs());
        let Some(first_tick) = Instant::now().checked_add(interval) else {
            warn!(interval_secs, "Heartbeat interval is out of range, heartbeat disabled");
            return None;
        };
        let token = CancellationToken::new();
        let stop = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(first_tick, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = stop.cancelled() => {
                        debug!("Heartbeat stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        dispatcher.dispatch(make_event(interval));
                    }
                }
            }
        });

        debug!(interval = ?interval, "Heartbeat started");
        Some(Self {
            interval,
            token,
            handle,
        })
    }

    /// Returns the tick interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signals the heartbeat task to stop. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops the heartbeat and waits for its task to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

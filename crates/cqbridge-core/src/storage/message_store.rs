//! Durable message records.
//!
//! Every message sent or received through the mediator is archived once as
//! a gzip-compressed JSON [`Msg`] under the big-endian bytes of its global id.
//! The archive backs features such as reply and recall; it is never required
//! for delivery, so every failure here is logged and contained.
//!
//! Persistence may be disabled entirely, in which case writes are no-ops and
//! reads always miss.

use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::{debug, warn};

use crate::foundation::error::{StoreError, StoreResult};
use crate::foundation::identity::{MessageId, store_key};
use crate::foundation::msg::Msg;
use crate::storage::kv::KvStore;

/// Compressed record store keyed by global message id.
pub struct MessageStore {
    backend: Option<Arc<dyn KvStore>>,
    closed: AtomicBool,
}

impl MessageStore {
    /// Creates a store writing through `backend`.
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self {
            backend: Some(backend),
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a store with persistence disabled.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns `true` if records are actually persisted.
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some() && !self.closed.load(Ordering::Acquire)
    }

    /// Archives `record` under `id`.
    ///
    /// Returns `Ok(true)` when written and `Ok(false)` when persistence is
    /// disabled. Errors are logged before being returned. An existing record
    /// under the same id is overwritten.
    pub async fn put(&self, id: MessageId, record: &Msg) -> StoreResult<bool> {
        let Some(backend) = self.live_backend() else {
            return Ok(false);
        };

        let result = match encode(record) {
            Ok(bytes) => run_blocking(move || backend.put(&store_key(id), &bytes)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!(id, error = %e, "Failed to archive message record");
                Err(e)
            }
        }
    }

    /// Loads the record stored under `id`.
    ///
    /// Returns `None` when persistence is disabled, the id is unknown, or the
    /// stored bytes cannot be decoded (the latter is logged).
    pub async fn get(&self, id: MessageId) -> Option<Msg> {
        let backend = self.live_backend()?;

        let loaded = run_blocking(move || backend.get(&store_key(id)))
            .await
            .and_then(|bytes| bytes.as_deref().map(decode).transpose());

        match loaded {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!(id, "Message record not found");
                None
            }
            Err(e) => {
                warn!(id, error = %e, "Failed to load message record");
                None
            }
        }
    }

    /// Releases the backend. Idempotent; a no-op when disabled.
    pub fn close(&self) {
        let Some(backend) = &self.backend else {
            return;
        };
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match backend.close() {
            Ok(()) => debug!("Message store closed"),
            Err(e) => warn!(error = %e, "Failed to close message store"),
        }
    }

    fn live_backend(&self) -> Option<Arc<dyn KvStore>> {
        if self.closed.load(Ordering::Acquire) {
            return None;
        }
        self.backend.clone()
    }
}

impl std::fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStore")
            .field("enabled", &self.backend.is_some())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}

fn encode(record: &Msg) -> StoreResult<Vec<u8>> {
    let json = serde_json::to_vec(record)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

fn decode(data: &[u8]) -> StoreResult<Msg> {
    let mut json = Vec::new();
    GzDecoder::new(data).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}

async fn run_blocking<T, F>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

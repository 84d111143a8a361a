//! Bridge runtime: configuration, storage and the inbound event pump.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cqbridge_runtime::BridgeRuntime;
//!
//! let runtime = BridgeRuntime::builder()
//!     .config_file("cqbridge.toml")
//!     .build()?;
//!
//! let bot = runtime.start(client)?;
//! bot.on_event_push(|event| async move {
//!     println!("{}", event.to_json());
//! });
//!
//! // `events` is the receiving half fed by the protocol client.
//! runtime.run(bot, events).await;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use cqbridge_adapter_onebot::{CqBot, InboundEvent, ProtocolClient};
use cqbridge_core::{EventFilter, FilterExpr, MessageStore, SqliteKvStore};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::{BridgeConfig, ConfigLoader, load_filter, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// How long shutdown waits for in-flight event handlers before aborting them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Owns the loaded configuration and wires a [`CqBot`] to its inputs.
#[derive(Debug)]
pub struct BridgeRuntime {
    config: BridgeConfig,
    filter: Option<Arc<FilterExpr>>,
}

impl BridgeRuntime {
    /// Loads configuration from the default locations and environment.
    pub fn load() -> RuntimeResult<Self> {
        RuntimeBuilder::new().build()
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Initializes logging (a no-op when a subscriber is already installed),
    /// installs the panic hook, validates the configuration and loads the
    /// event filter file.
    pub fn from_config(config: BridgeConfig) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);
        logging::install_panic_hook();

        validate_config(&config)?;
        let filter = load_filter(&config.filter)?.map(Arc::new);

        info!(
            log_level = %config.logging.level,
            database = config.database.enabled,
            filter = filter.is_some(),
            "Runtime initialized from configuration"
        );

        Ok(Self { config, filter })
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the loaded event filter, if any.
    pub fn filter(&self) -> Option<&Arc<FilterExpr>> {
        self.filter.as_ref()
    }

    /// Opens the message store described by the configuration.
    ///
    /// A disabled database yields a store that drops every write. A database
    /// that is enabled but cannot be opened is an error.
    pub fn open_store(&self) -> RuntimeResult<MessageStore> {
        let database = &self.config.database;
        if !database.enabled {
            info!("Message database disabled");
            return Ok(MessageStore::disabled());
        }

        let backend = SqliteKvStore::open(&database.path).inspect_err(|e| {
            error!(path = %database.path.display(), error = %e, "Failed to open message database");
        })?;
        info!(path = %database.path.display(), "Message database opened");
        Ok(MessageStore::new(Arc::new(backend)))
    }

    /// Builds the bot for `client`: opens the store, starts the heartbeat
    /// and installs the event filter.
    pub fn start(&self, client: Arc<dyn ProtocolClient>) -> RuntimeResult<Arc<CqBot>> {
        let store = self.open_store()?;
        ensure_dir(&self.config.bot.cache_dir);

        let bot = CqBot::new(client, store, self.config.bot.clone());
        bot.set_event_filter(
            self.filter
                .clone()
                .map(|filter| filter as Arc<dyn EventFilter>),
        );

        info!(self_id = bot.self_id(), "Bot started");
        Ok(Arc::new(bot))
    }

    /// Pumps events into `bot` until Ctrl+C / SIGTERM or until the event
    /// source closes, then releases the bot.
    pub async fn run(&self, bot: Arc<CqBot>, events: mpsc::Receiver<InboundEvent>) {
        info!("cqbridge is now running. Press Ctrl+C to stop.");
        self.run_until(bot, events, wait_for_shutdown()).await;
    }

    /// Pumps events into `bot` until `shutdown` resolves or the event source
    /// closes, then releases the bot.
    ///
    /// Subscribers still running at that point get [`SHUTDOWN_GRACE`] to
    /// finish; whatever is left is aborted. The bot is released either way.
    pub async fn run_until<F>(
        &self,
        bot: Arc<CqBot>,
        mut events: mpsc::Receiver<InboundEvent>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut tasks: JoinSet<Vec<JoinHandle<()>>> = JoinSet::new();
        let mut subscribers: Vec<JoinHandle<()>> = Vec::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        debug!(kind = event.kind(), "Inbound event");
                        let bot = Arc::clone(&bot);
                        tasks.spawn(async move { bot.handle_event(event).await });
                    }
                    None => {
                        info!("Event source closed");
                        break;
                    }
                },
                Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                    subscribers.retain(|handle| !handle.is_finished());
                    collect_handles(result, &mut subscribers);
                }
            }
        }

        let drain = async {
            while let Some(result) = tasks.join_next().await {
                collect_handles(result, &mut subscribers);
            }
            for handle in subscribers.iter_mut() {
                let _ = handle.await;
            }
        };
        if time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            let pending = tasks.len()
                + subscribers
                    .iter()
                    .filter(|handle| !handle.is_finished())
                    .count();
            warn!(
                pending,
                "Event handlers still running after {SHUTDOWN_GRACE:?}, aborting them"
            );
            tasks.abort_all();
            for handle in &subscribers {
                handle.abort();
            }
        }

        bot.release();
        info!("Runtime stopped");
    }
}

fn collect_handles(
    result: Result<Vec<JoinHandle<()>>, tokio::task::JoinError>,
    subscribers: &mut Vec<JoinHandle<()>>,
) {
    match result {
        Ok(handles) => subscribers.extend(handles),
        Err(e) => error!(error = %e, "Event task failed"),
    }
}

fn ensure_dir(dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        warn!(path = %dir.display(), error = %e, "Failed to create cache directory");
    }
}

/// Waits for Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`BridgeRuntime`] with custom configuration sources.
///
/// ```rust,ignore
/// let runtime = BridgeRuntime::builder()
///     .config_file("config/cqbridge.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BridgeConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<BridgeRuntime> {
        let config = self.config_loader.load()?;
        BridgeRuntime::from_config(config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

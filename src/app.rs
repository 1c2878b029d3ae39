//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::Terminal,
    dispatcher::Dispatcher,
    internal_metrics::Metrics,
    listener::FeedListener,
    matching::KeywordClassifier,
    network::{Backoff, CertStreamClient, WebSocketConnection},
    persistence::{PersistedLineSet, PersistenceWriter},
    store::DomainStore,
    task_manager::TaskManager,
    terminal::StdTerminal,
    utils::heartbeat::run_heartbeat,
};
use anyhow::{anyhow, Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

/// How long background tasks get to finish after the operator quits.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A handle to the running application.
pub struct App {
    task_manager: TaskManager,
    store: Arc<DomainStore>,
    dispatcher: Dispatcher,
    fatal_rx: mpsc::UnboundedReceiver<anyhow::Error>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The shared domain store the background tasks feed.
    pub fn store(&self) -> Arc<DomainStore> {
        self.store.clone()
    }

    /// Runs the command dispatcher until the operator quits, or until a
    /// background task reports an unrecoverable error, then shuts down all
    /// background tasks.
    ///
    /// # Returns
    /// * `Ok(())` when the operator quit
    /// * `Err` for a fatal persistence or terminal error
    pub async fn run(self) -> Result<()> {
        let App {
            task_manager,
            dispatcher,
            mut fatal_rx,
            ..
        } = self;

        let result = tokio::select! {
            res = dispatcher.run() => res,
            // The writer only drops its sender after reporting or on shutdown,
            // so a closed channel here means it died.
            fatal = fatal_rx.recv() => Err(fatal.unwrap_or_else(|| {
                anyhow!("Persistence writer stopped unexpectedly")
            })),
        };

        info!("Shutting down background tasks...");
        task_manager.shutdown(SHUTDOWN_GRACE).await;
        result
    }
}

/// Builder for the main application.
///
/// Separates constructing the components from running them, and lets
/// tests swap the websocket connection and the terminal.
pub struct AppBuilder {
    config: Config,
    websocket_override: Option<Box<dyn WebSocketConnection>>,
    terminal_override: Option<Arc<dyn Terminal>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            websocket_override: None,
            terminal_override: None,
        }
    }

    /// Overrides the WebSocket connection for testing.
    pub fn websocket_override(mut self, ws: Box<dyn WebSocketConnection>) -> Self {
        self.websocket_override = Some(ws);
        self
    }

    /// Overrides the operator terminal for testing.
    pub fn terminal_override(mut self, terminal: Arc<dyn Terminal>) -> Self {
        self.terminal_override = Some(terminal);
        self
    }

    /// Builds all components and spawns the background tasks.
    #[instrument(skip_all)]
    pub async fn build(self) -> Result<App> {
        let config = self.config;
        config.validate()?;
        let task_manager = TaskManager::new();
        let metrics = Metrics::new();
        let terminal = match self.terminal_override {
            Some(terminal) => terminal,
            None => Arc::new(StdTerminal::new()?) as Arc<dyn Terminal>,
        };

        // =========================================================================
        // 1. Shared State
        // =========================================================================
        let classifier = Arc::new(KeywordClassifier::new(config.matching.keywords.clone())?);
        debug!(keywords = ?classifier.keywords(), "Keyword classifier compiled");
        let store = Arc::new(DomainStore::new());

        let output_path = config.output.path.clone();
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
        let persisted = PersistedLineSet::load(&output_path).await?;
        info!(
            "Seeded {} already persisted domains from {}",
            persisted.len(),
            output_path.display()
        );

        // =========================================================================
        // 2. Feed Listener
        // =========================================================================
        let listener = Arc::new(FeedListener::new(classifier, store.clone(), metrics.clone()));
        let backoff = Backoff {
            initial: Duration::from_millis(config.network.reconnect_initial_backoff_ms),
            max: Duration::from_millis(config.network.reconnect_max_backoff_ms),
        };
        let certstream_client = CertStreamClient::new(
            config.network.certstream_url.clone(),
            listener,
            backoff,
            metrics.clone(),
        );

        let websocket_override = self.websocket_override;
        let mut shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("CertStreamClient", async move {
            let hb_shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move { run_heartbeat("CertStreamClient", hb_shutdown_rx).await });

            let result = if let Some(ws) = websocket_override {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        info!("CertStream client (override) received shutdown signal.");
                        Ok(())
                    },
                    res = certstream_client.run_with_connection(ws) => res,
                }
            } else {
                certstream_client.run(shutdown_rx).await
            };

            if let Err(e) = result {
                error!("CertStream client failed: {}", e);
            }
        });

        // =========================================================================
        // 3. Persistence Writer
        // =========================================================================
        let (fatal_tx, fatal_rx) = mpsc::unbounded_channel();
        let writer = PersistenceWriter::new(output_path.clone(), store.clone(), persisted, metrics);
        task_manager.spawn(
            "PersistenceWriter",
            writer.run(config.persistence_interval(), task_manager.get_shutdown_rx(), fatal_tx),
        );

        // =========================================================================
        // 4. Command Dispatcher
        // =========================================================================
        let dispatcher = Dispatcher::new(
            terminal,
            store.clone(),
            output_path,
            config.refresh_interval(),
            config.error_pause(),
        );

        info!("SodaCert initialized successfully. Monitoring for domains...");

        Ok(App {
            task_manager,
            store,
            dispatcher,
            fatal_rx,
        })
    }
}

//! Network client for CertStream WebSocket connection
//!
//! This module handles connecting to the certstream websocket, parsing
//! messages, and managing reconnection logic.

use crate::core::CertEvent;
use crate::internal_metrics::Metrics;
use crate::listener::FeedListener;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{SplitStream, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

/// Parses a raw certstream JSON message into a [`CertEvent`].
///
/// Only `message_type` and `data.leaf_cert.subject.CN` are read. A missing or
/// null common name yields an empty string rather than an error.
///
/// # Returns
/// * `Ok(CertEvent)` for any well-formed JSON object
/// * `Err` if the JSON is malformed
pub fn parse_message(text: &str) -> Result<CertEvent> {
    // Temporary structs for parsing certstream JSON structure
    #[derive(Deserialize)]
    struct CertStreamMessage {
        #[serde(default)]
        message_type: Option<String>,
        #[serde(default)]
        data: Option<MessageData>,
    }

    #[derive(Deserialize)]
    struct MessageData {
        #[serde(default)]
        leaf_cert: Option<LeafCert>,
    }

    #[derive(Deserialize)]
    struct LeafCert {
        #[serde(default)]
        subject: Option<Subject>,
    }

    #[derive(Deserialize)]
    struct Subject {
        #[serde(rename = "CN", default)]
        common_name: Option<String>,
    }

    let message: CertStreamMessage = serde_json::from_str(text)?;
    let common_name = message
        .data
        .and_then(|data| data.leaf_cert)
        .and_then(|leaf| leaf.subject)
        .and_then(|subject| subject.common_name)
        .unwrap_or_default();

    Ok(CertEvent {
        message_type: message.message_type.unwrap_or_default(),
        common_name,
    })
}

/// Trait for WebSocket connections to enable testing with fake implementations
#[async_trait]
pub trait WebSocketConnection: Send + Sync {
    /// Reads the next message from the WebSocket connection
    ///
    /// # Returns
    /// * `Some(Ok(Message))` if a message was successfully received
    /// * `Some(Err(error))` if there was an error reading the message
    /// * `None` if the connection has been closed
    async fn read_message(&mut self) -> Option<Result<Message, WsError>>;
}

/// The read half of a live tungstenite connection.
struct TungsteniteConnection {
    read: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

#[async_trait]
impl WebSocketConnection for TungsteniteConnection {
    async fn read_message(&mut self) -> Option<Result<Message, WsError>> {
        self.read.next().await
    }
}

/// Reconnection backoff bounds for [`CertStreamClient::run`].
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(1000),
            max: Duration::from_millis(60_000),
        }
    }
}

/// CertStream WebSocket client that connects to the certstream service
/// and feeds every certificate event to the [`FeedListener`]
pub struct CertStreamClient {
    url: String,
    listener: Arc<FeedListener>,
    backoff: Backoff,
    metrics: Metrics,
}

impl CertStreamClient {
    /// Creates a new CertStream client
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to (e.g., "wss://certstream.calidog.io/")
    /// * `listener` - The stage that classifies and stores each event
    pub fn new(
        url: String,
        listener: Arc<FeedListener>,
        backoff: Backoff,
        metrics: Metrics,
    ) -> Self {
        Self {
            url,
            listener,
            backoff,
            metrics,
        }
    }

    /// Runs the client with a custom WebSocket connection (primarily for testing)
    ///
    /// This method processes messages from the provided connection until it closes,
    /// then returns. It does not implement reconnection logic.
    ///
    /// # Returns
    /// * `Ok(())` when the peer closed the connection
    /// * `Err` on a transport error; the stream is finished after one, so the
    ///   caller has to reconnect
    pub async fn run_with_connection(
        &self,
        mut connection: Box<dyn WebSocketConnection>,
    ) -> Result<()> {
        info!("Starting CertStream client message processing");

        loop {
            match connection.read_message().await {
                Some(Ok(Message::Text(text))) => self.handle_text(&text),
                Some(Ok(Message::Binary(_))) => {
                    debug!("Received binary message, ignoring");
                }
                Some(Ok(Message::Ping(_))) => {
                    debug!("Received ping message");
                }
                Some(Ok(Message::Pong(_))) => {
                    debug!("Received pong message");
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Received close message from server");
                    break;
                }
                Some(Ok(Message::Frame(_))) => {
                    debug!("Received frame message, ignoring");
                }
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => {
                    info!("WebSocket connection closed by transport");
                    break;
                }
                Some(Err(e)) => {
                    // tungstenite ends the stream after any read error.
                    return Err(e).context("WebSocket read failed");
                }
                None => {
                    info!("WebSocket connection closed");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Runs the client with automatic reconnection to the configured URL
    ///
    /// This method implements the main client loop with exponential backoff
    /// reconnection logic. It runs until the shutdown signal is received.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let mut backoff = self.backoff.initial;

        loop {
            info!("Attempting to connect to {}", self.url);

            let result = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("CertStream client received shutdown signal.");
                    return Ok(());
                }
                res = self.connect_and_run() => res,
            };

            self.metrics.websocket_disconnects_total.increment(1);
            match result {
                Ok(()) => {
                    info!("Connection closed normally");
                    backoff = self.backoff.initial;
                }
                Err(e) => {
                    error!("Connection failed: {}", e);
                }
            }

            info!("Reconnecting in {} ms", backoff.as_millis());
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("CertStream client received shutdown signal during backoff.");
                    return Ok(());
                }
                _ = tokio::time::sleep(backoff) => {}
            }

            backoff = std::cmp::min(backoff * 2, self.backoff.max);
        }
    }

    /// Connects to the WebSocket URL and runs the message processing loop
    async fn connect_and_run(&self) -> Result<()> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to {}: {}", self.url, e))?;

        info!("Connected to {}", self.url);

        let (_, read) = ws_stream.split();
        self.run_with_connection(Box::new(TungsteniteConnection { read }))
            .await
    }

    fn handle_text(&self, text: &str) {
        match parse_message(text) {
            Ok(event) => {
                self.listener.handle_event(&event);
            }
            Err(e) => {
                self.metrics.events_malformed_total.increment(1);
                warn!("Failed to parse certstream message: {}", e);
            }
        }
    }
}

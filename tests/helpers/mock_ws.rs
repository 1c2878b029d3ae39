#![allow(dead_code)]
//! Channel-backed WebSocketConnection for feeding the CertStreamClient
use async_trait::async_trait;
use sodacert::network::WebSocketConnection;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error, Message};

/// The read side handed to the application. Closes once the `FeedHandle` is
/// dropped, or after yielding an error, as a tungstenite stream does.
pub struct ChannelWebSocket {
    rx: mpsc::UnboundedReceiver<Result<Message, Error>>,
    ended: bool,
}

/// The test's side of the connection.
#[derive(Clone)]
pub struct FeedHandle {
    tx: mpsc::UnboundedSender<Result<Message, Error>>,
}

pub fn channel_websocket() -> (FeedHandle, ChannelWebSocket) {
    let (tx, rx) = mpsc::unbounded_channel();
    (FeedHandle { tx }, ChannelWebSocket { rx, ended: false })
}

pub fn certificate_json(common_name: &str) -> String {
    serde_json::json!({
        "message_type": "certificate_update",
        "data": {
            "update_type": "X509LogEntry",
            "leaf_cert": {
                "subject": { "CN": common_name },
                "all_domains": [common_name]
            }
        }
    })
    .to_string()
}

impl FeedHandle {
    pub fn certificate(&self, common_name: &str) {
        self.text(&certificate_json(common_name));
    }

    pub fn certificate_without_cn(&self) {
        self.text(
            r#"{"message_type": "certificate_update", "data": {"leaf_cert": {"subject": {}}}}"#,
        );
    }

    pub fn heartbeat(&self) {
        self.text(r#"{"message_type": "heartbeat", "timestamp": 1700000000.0}"#);
    }

    pub fn text(&self, text: &str) {
        let _ = self.tx.send(Ok(Message::Text(text.to_string().into())));
    }

    pub fn close(&self) {
        let _ = self.tx.send(Ok(Message::Close(None)));
    }

    pub fn error(&self, error: Error) {
        let _ = self.tx.send(Err(error));
    }
}

#[async_trait]
impl WebSocketConnection for ChannelWebSocket {
    async fn read_message(&mut self) -> Option<Result<Message, Error>> {
        if self.ended {
            return None;
        }
        let next = self.rx.recv().await;
        self.ended = matches!(next, Some(Err(_)));
        next
    }
}

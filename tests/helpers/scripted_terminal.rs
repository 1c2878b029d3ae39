#![allow(dead_code)]
//! A Terminal whose input is fed by the test and whose output is captured.
use anyhow::Result;
use async_trait::async_trait;
use sodacert::core::Terminal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct ScriptedTerminal {
    input_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    output: Mutex<String>,
    clears: AtomicUsize,
}

/// Sends operator lines. Dropping every handle ends the input stream.
#[derive(Clone)]
pub struct InputHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl InputHandle {
    pub fn line(&self, line: &str) {
        let _ = self.tx.send(line.to_string());
    }
}

impl ScriptedTerminal {
    pub fn new() -> (Self, InputHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let terminal = Self {
            input_rx: tokio::sync::Mutex::new(rx),
            output: Mutex::new(String::new()),
            clears: AtomicUsize::new(0),
        };
        (terminal, InputHandle { tx })
    }

    pub fn output(&self) -> String {
        self.output.lock().unwrap().clone()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }

    pub fn count(&self, needle: &str) -> usize {
        self.output().matches(needle).count()
    }

    /// Waits until `needle` has been printed at least `times` times.
    pub async fn wait_for(&self, needle: &str, times: usize, timeout: Duration) {
        let wait = async {
            while self.count(needle) < times {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for {needle:?} x{times}"));
    }
}

#[async_trait]
impl Terminal for ScriptedTerminal {
    fn print(&self, text: &str) {
        self.output.lock().unwrap().push_str(text);
    }

    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    async fn read_line(&self) -> Result<Option<String>> {
        Ok(self.input_rx.lock().await.recv().await)
    }
}

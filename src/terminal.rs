//! Standard input/output implementation of the [`Terminal`] service.

use crate::core::Terminal;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::Mutex;
use tracing::warn;

/// ANSI sequence: erase the whole display, then home the cursor.
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

/// Fails on platforms where the screen cannot be cleared.
pub fn ensure_clear_supported() -> Result<()> {
    if cfg!(any(unix, windows)) {
        Ok(())
    } else {
        bail!(
            "Unsupported platform '{}': can't clear screen",
            std::env::consts::OS
        )
    }
}

/// The process's own stdin/stdout.
pub struct StdTerminal {
    stdin: Mutex<BufReader<Stdin>>,
}

impl StdTerminal {
    pub fn new() -> Result<Self> {
        ensure_clear_supported()?;
        Ok(Self {
            stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
        })
    }
}

#[async_trait]
impl Terminal for StdTerminal {
    fn print(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            warn!("Failed to write to stdout: {}", e);
        }
    }

    fn clear(&self) {
        self.print(CLEAR_SCREEN);
    }

    async fn read_line(&self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.stdin.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

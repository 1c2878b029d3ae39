//! The live viewer: a cancellable task that redraws the discovered domains
//! at a fixed refresh rate.

use crate::core::Terminal;
use crate::store::DomainStore;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

pub const DIVIDER: &str = "##-DAP?-######################################################-:)-###";

/// Renders one frame of the live view.
///
/// Both sets are listed in discovery order, followed by the footer prompt.
pub fn render_live(store: &DomainStore) -> String {
    let plain = store.plain().snapshot();
    let punycode = store.punycode().snapshot();

    let mut frame = String::new();
    frame.push_str(&format!("{}\n", "CertStream live view".bright_cyan().bold()));
    frame.push_str(&format!("\n{}\n", DIVIDER.bright_red().bold()));

    frame.push_str(&format!("\n{} ({})\n", "Normal domains:".bright_green().bold(), plain.len()));
    frame.push_str(&plain.join(", "));
    frame.push('\n');

    frame.push_str(&format!("\n{} ({})\n", "Puny domains:".bright_red().bold(), punycode.len()));
    frame.push_str(&punycode.join(", "));
    frame.push('\n');

    frame.push_str(&format!("\n{}\n", DIVIDER.bright_red().bold()));
    frame.push_str(&format!("\n{}", "Hit enter to go back to main menu: ".bright_cyan().bold()));
    frame
}

/// Periodically renders the store until cancelled. Never writes to the store.
pub struct LiveViewer {
    terminal: Arc<dyn Terminal>,
    store: Arc<DomainStore>,
    refresh: Duration,
}

impl LiveViewer {
    pub fn new(terminal: Arc<dyn Terminal>, store: Arc<DomainStore>, refresh: Duration) -> Self {
        Self {
            terminal,
            store,
            refresh,
        }
    }

    /// Redraws every `refresh` until `cancel_rx` fires or its sender is dropped.
    ///
    /// Returns the number of frames rendered.
    pub async fn run(self, mut cancel_rx: oneshot::Receiver<()>) -> usize {
        let mut ticker = tokio::time::interval(self.refresh);
        let mut frames = 0;
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => break,
                _ = ticker.tick() => {
                    self.terminal.clear();
                    self.terminal.print(&render_live(&self.store));
                    frames += 1;
                }
            }
        }
        debug!(frames, "Live viewer stopped");
        frames
    }
}

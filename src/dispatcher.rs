//! The operator command loop.
//!
//! A small state machine driven by one line of input per transition. It
//! starts and stops the live viewer and dumps the output file; it never
//! touches the domain store itself.

use crate::core::Terminal;
use crate::store::DomainStore;
use crate::viewer::{LiveViewer, DIVIDER};
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

/// An operator command, parsed from one line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Output,
    Quit,
    /// A blank line; the prompt is shown again.
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "" => Command::Empty,
            "show" => Command::Show,
            "output" => Command::Output,
            "quit" | "q" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Dispatcher states. `Exit` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Menu,
    Live,
    OutputDump,
    Exit,
}

pub const PROMPT: &str = "sodacert ~> ";

/// Renders the banner, the command list and the prompt.
pub fn render_menu() -> String {
    let mut menu = String::new();
    let banner = "SODACERT :: suspicious certificate monitor";
    menu.push_str(&format!("{}\n", banner.bright_cyan().bold()));
    menu.push_str(&format!("\n{}\n", DIVIDER.bright_red().bold()));
    menu.push_str(&format!("\n{}\n", "Available commands:".bright_cyan().bold()));
    for (command, help) in [
        ("show", "Show live certstream listener"),
        ("output", "Print the persisted domains file"),
        ("quit", "Exit program"),
    ] {
        let label = format!("{:<10}", format!("{command}:"));
        menu.push_str(&format!("\n  => {}{}\n", label.bright_green().bold(), help));
    }
    menu.push('\n');
    menu.push_str(PROMPT);
    menu
}

pub struct Dispatcher {
    terminal: Arc<dyn Terminal>,
    store: Arc<DomainStore>,
    output_path: PathBuf,
    refresh: Duration,
    error_pause: Duration,
}

impl Dispatcher {
    pub fn new(
        terminal: Arc<dyn Terminal>,
        store: Arc<DomainStore>,
        output_path: PathBuf,
        refresh: Duration,
        error_pause: Duration,
    ) -> Self {
        Self {
            terminal,
            store,
            output_path,
            refresh,
            error_pause,
        }
    }

    /// Draws the menu and runs transitions until `Exit`.
    ///
    /// # Returns
    /// * `Ok(())` once the operator quits or input ends
    /// * `Err` if reading input or the output file fails
    pub async fn run(&self) -> Result<()> {
        self.redraw_menu();
        let mut state = State::Menu;
        while state != State::Exit {
            state = self.step(state).await?;
            debug!(?state, "Dispatcher transition");
        }
        info!("Operator requested exit.");
        Ok(())
    }

    /// Performs one transition out of `state`.
    pub async fn step(&self, state: State) -> Result<State> {
        match state {
            State::Menu => self.menu().await,
            State::Live => self.live().await,
            State::OutputDump => self.output_dump().await,
            State::Exit => Ok(State::Exit),
        }
    }

    async fn menu(&self) -> Result<State> {
        let Some(line) = self.terminal.read_line().await? else {
            return Ok(State::Exit);
        };

        Ok(match Command::parse(&line) {
            Command::Show => State::Live,
            Command::Output => State::OutputDump,
            Command::Quit => State::Exit,
            Command::Empty => {
                self.terminal.print(PROMPT);
                State::Menu
            }
            Command::Unknown(input) => {
                debug!(input = %input, "Unknown command");
                let message =
                    format!("Unknown command '{input}'. Try entering a valid command next time!");
                self.terminal.print(&format!("{}\n", message.red()));
                tokio::time::sleep(self.error_pause).await;
                self.redraw_menu();
                State::Menu
            }
        })
    }

    async fn live(&self) -> Result<State> {
        let viewer = LiveViewer::new(self.terminal.clone(), self.store.clone(), self.refresh);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let handle = tokio::spawn(viewer.run(cancel_rx));

        let input = self.terminal.read_line().await;

        let _ = cancel_tx.send(());
        handle.await.context("Live viewer task panicked")?;
        input?;

        self.redraw_menu();
        Ok(State::Menu)
    }

    async fn output_dump(&self) -> Result<State> {
        let content = match tokio::fs::read_to_string(&self.output_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read output file: {}", self.output_path.display())
                })
            }
        };

        self.terminal.clear();
        let header = format!("Persisted domains ({})", self.output_path.display());
        self.terminal.print(&format!("{}\n\n", header.bright_cyan().bold()));
        if content.is_empty() {
            self.terminal.print("No domains persisted yet.\n");
        } else {
            self.terminal.print(&content);
        }
        self.terminal.print(&format!(
            "\n{}",
            "Hit enter to go back to main menu: ".bright_cyan().bold()
        ));

        self.terminal.read_line().await?;
        self.redraw_menu();
        Ok(State::Menu)
    }

    fn redraw_menu(&self) {
        self.terminal.clear();
        self.terminal.print(&render_menu());
    }
}

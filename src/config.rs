//! Configuration management for SodaCert
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer defaults, an optional `sodacert.toml` file, environment
//! variables and command-line arguments.

use crate::cli::Cli;
use crate::matching::DEFAULT_KEYWORDS;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "sodacert.toml";

/// A configuration value that would stall or crash a background task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error(
        "network.reconnect_initial_backoff_ms ({initial}) exceeds network.reconnect_max_backoff_ms ({max})"
    )]
    BackoffRange { initial: u64, max: u64 },
}

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Log records go to this file; the terminal belongs to the operator UI.
    pub log_file: PathBuf,
    /// Configuration for the CertStream network client.
    pub network: NetworkConfig,
    /// Configuration for keyword matching.
    pub matching: MatchingConfig,
    /// Configuration for the output file.
    pub output: OutputConfig,
    /// Configuration for the persistence writer.
    pub persistence: PersistenceConfig,
    /// Configuration for the live viewer and command prompt.
    pub viewer: ViewerConfig,
}

/// Configuration for the CertStream network client.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// The URL of the CertStream WebSocket server (full certificate stream).
    pub certstream_url: String,
    /// Delay before the first reconnection attempt.
    pub reconnect_initial_backoff_ms: u64,
    /// Upper bound for the doubling reconnection delay.
    pub reconnect_max_backoff_ms: u64,
}

/// Configuration for keyword matching.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Substrings that make a common name interesting. Case-sensitive.
    pub keywords: Vec<String>,
}

/// Configuration for the output file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Append-only file holding one plain domain per line.
    pub path: PathBuf,
}

/// Configuration for the persistence writer.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Interval between persistence ticks.
    pub interval_ms: u64,
}

/// Configuration for the live viewer and command prompt.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Interval between live view redraws.
    pub refresh_ms: u64,
    /// How long an unknown-command message stays up before the menu redraws.
    pub error_pause_ms: u64,
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are merged in order, later ones winning: built-in defaults,
    /// the TOML file (`--config` or `sodacert.toml`), `SODACERT_` environment
    /// variables (`__` separates nested keys), and command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. SODACERT_OUTPUT__PATH=/var/lib/sodacert/domains.txt
            .merge(Env::prefixed("SODACERT_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the runtime cannot work with.
    ///
    /// Timer periods must be non-zero (`tokio::time::interval` panics on a
    /// zero period) and the reconnect backoff must double towards a
    /// reachable bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("persistence.interval_ms", self.persistence.interval_ms),
            ("viewer.refresh_ms", self.viewer.refresh_ms),
            (
                "network.reconnect_initial_backoff_ms",
                self.network.reconnect_initial_backoff_ms,
            ),
            (
                "network.reconnect_max_backoff_ms",
                self.network.reconnect_max_backoff_ms,
            ),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { field });
            }
        }

        let (initial, max) = (
            self.network.reconnect_initial_backoff_ms,
            self.network.reconnect_max_backoff_ms,
        );
        if initial > max {
            return Err(ConfigError::BackoffRange { initial, max });
        }
        Ok(())
    }

    pub fn persistence_interval(&self) -> Duration {
        Duration::from_millis(self.persistence.interval_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.viewer.refresh_ms)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_millis(self.viewer.error_pause_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: PathBuf::from("sodacert.log"),
            network: NetworkConfig::default(),
            matching: MatchingConfig::default(),
            output: OutputConfig::default(),
            persistence: PersistenceConfig::default(),
            viewer: ViewerConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            certstream_url: "wss://certstream.calidog.io/".to_string(),
            reconnect_initial_backoff_ms: 1000,
            reconnect_max_backoff_ms: 60_000,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output/domains.txt"),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { interval_ms: 2500 }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 100,
            error_pause_ms: 600,
        }
    }
}

//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `sodacert.toml` file and environment variables.
//! Interactive commands (`show`, `output`, `quit`) are read from stdin, not argv.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Live monitor for newly issued TLS certificates with suspicious names.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// CertStream WebSocket URL.
    #[arg(long, value_name = "URL")]
    pub certstream_url: Option<String>,

    /// File that matched domains are appended to.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log level filter (e.g. "debug", "info,sodacert=trace").
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// File that log records are written to.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Remove repeated lines from the output file, then exit.
    #[arg(long)]
    pub dedupe: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(url) = &self.certstream_url {
            let mut network = Dict::new();
            network.insert("certstream_url".into(), Value::from(url.clone()));
            dict.insert("network".into(), Value::from(network));
        }

        if let Some(path) = &self.output {
            let mut output = Dict::new();
            output.insert(
                "path".into(),
                Value::from(path.to_string_lossy().into_owned()),
            );
            dict.insert("output".into(), Value::from(output));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(path) = &self.log_file {
            dict.insert(
                "log_file".into(),
                Value::from(path.to_string_lossy().into_owned()),
            );
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let cli = Cli::parse_from([
            "sodacert",
            "--config",
            "custom.toml",
            "--output",
            "/tmp/out.txt",
            "--dedupe",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out.txt")));
        assert!(cli.dedupe);
        assert!(cli.certstream_url.is_none());
    }

    #[test]
    fn test_provider_only_sets_given_flags() {
        let cli = Cli {
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let data = cli.data().unwrap();
        let dict = &data[&Profile::Default];
        assert_eq!(dict.len(), 1);
        assert!(dict.contains_key("log_level"));
    }
}

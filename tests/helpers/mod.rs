#![allow(dead_code)]

pub mod mock_ws;
pub mod scripted_terminal;

use sodacert::config::Config;
use std::path::Path;

/// A config suited to tests: fast ticks, no error pause, output under `dir`.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.network.certstream_url = "ws://127.0.0.1:12345".to_string(); // Mock URL
    config.output.path = dir.join("output").join("domains.txt");
    config.log_file = dir.join("sodacert.log");
    config.persistence.interval_ms = 20;
    config.viewer.refresh_ms = 10;
    config.viewer.error_pause_ms = 0;
    config
}

use serial_test::serial;
use sodacert::cli::Cli;
use sodacert::config::{Config, ConfigError};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

fn config_file(toml_content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    file
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let file = config_file(
        r#"
        log_level = "debug"
        log_file = "/var/log/sodacert.log"
        [network]
        certstream_url = "ws://example.com/certstream"
        reconnect_initial_backoff_ms = 250
        reconnect_max_backoff_ms = 8000
        [matching]
        keywords = ["phish", "wallet"]
        [output]
        path = "/var/lib/sodacert/domains.txt"
        [persistence]
        interval_ms = 1000
        [viewer]
        refresh_ms = 200
        error_pause_ms = 0
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.log_file, PathBuf::from("/var/log/sodacert.log"));
    assert_eq!(config.network.certstream_url, "ws://example.com/certstream");
    assert_eq!(config.network.reconnect_initial_backoff_ms, 250);
    assert_eq!(config.network.reconnect_max_backoff_ms, 8000);
    assert_eq!(config.matching.keywords, vec!["phish", "wallet"]);
    assert_eq!(config.output.path, PathBuf::from("/var/lib/sodacert/domains.txt"));
    assert_eq!(config.persistence_interval(), Duration::from_millis(1000));
    assert_eq!(config.refresh_interval(), Duration::from_millis(200));
    assert_eq!(config.error_pause(), Duration::ZERO);
}

#[test]
#[serial]
fn test_partial_config_keeps_defaults() {
    let file = config_file(
        r#"
        [output]
        path = "found.txt"
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();
    let defaults = Config::default();

    assert_eq!(config.output.path, PathBuf::from("found.txt"));
    assert_eq!(config.network, defaults.network);
    assert_eq!(config.matching.keywords, defaults.matching.keywords);
    assert_eq!(config.persistence.interval_ms, 2500);
    assert_eq!(config.viewer.refresh_ms, 100);
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    let cli = Cli {
        config: Some(PathBuf::from("/nonexistent/sodacert.toml")),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
#[serial]
fn test_cli_overrides_file() {
    let file = config_file(
        r#"
        log_level = "warn"
        [network]
        certstream_url = "ws://from-file.example"
        [output]
        path = "from-file.txt"
    "#,
    );

    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        certstream_url: Some("ws://from-cli.example".to_string()),
        output: Some(PathBuf::from("from-cli.txt")),
        log_level: Some("trace".to_string()),
        ..Default::default()
    };
    let config = Config::load(&cli).unwrap();

    assert_eq!(config.network.certstream_url, "ws://from-cli.example");
    assert_eq!(config.output.path, PathBuf::from("from-cli.txt"));
    assert_eq!(config.log_level, "trace");
    // Untouched by the CLI layer.
    assert_eq!(config.network.reconnect_max_backoff_ms, 60_000);
}

#[test]
#[serial]
fn test_env_overrides_file_and_cli_overrides_env() {
    let file = config_file(
        r#"
        [output]
        path = "from-file.txt"
        [persistence]
        interval_ms = 1000
    "#,
    );

    std::env::set_var("SODACERT_PERSISTENCE__INTERVAL_MS", "5000");
    std::env::set_var("SODACERT_OUTPUT__PATH", "from-env.txt");

    let file_only = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let with_cli = Cli {
        output: Some(PathBuf::from("from-cli.txt")),
        ..file_only.clone()
    };
    let env_config = Config::load(&file_only);
    let cli_config = Config::load(&with_cli);

    std::env::remove_var("SODACERT_PERSISTENCE__INTERVAL_MS");
    std::env::remove_var("SODACERT_OUTPUT__PATH");

    let env_config = env_config.unwrap();
    assert_eq!(env_config.persistence.interval_ms, 5000);
    assert_eq!(env_config.output.path, PathBuf::from("from-env.txt"));

    let cli_config = cli_config.unwrap();
    assert_eq!(cli_config.output.path, PathBuf::from("from-cli.txt"));
    assert_eq!(cli_config.persistence.interval_ms, 5000);
}

#[test]
#[serial]
fn test_invalid_value_is_an_error() {
    let file = config_file(
        r#"
        [persistence]
        interval_ms = "soon"
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    assert!(Config::load(&cli).is_err());
}

#[test]
#[serial]
fn test_zero_intervals_are_rejected() {
    for (section, key) in [
        ("persistence", "interval_ms"),
        ("viewer", "refresh_ms"),
        ("network", "reconnect_initial_backoff_ms"),
    ] {
        let file = config_file(&format!("[{section}]\n{key} = 0\n"));
        let cli = Cli {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let err = Config::load(&cli).unwrap_err();
        let field = format!("{section}.{key}");
        assert!(
            matches!(
                err.downcast_ref::<ConfigError>(),
                Some(ConfigError::ZeroValue { field: f }) if *f == field
            ),
            "unexpected error for {field}: {err:#}"
        );
    }
}

#[test]
#[serial]
fn test_zero_interval_from_env_is_rejected() {
    std::env::set_var("SODACERT_PERSISTENCE__INTERVAL_MS", "0");
    let result = Config::load(&Cli {
        config: Some(PathBuf::from("/nonexistent/sodacert.toml")),
        ..Default::default()
    });
    std::env::remove_var("SODACERT_PERSISTENCE__INTERVAL_MS");

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_initial_backoff_above_max_is_rejected() {
    let file = config_file(
        r#"
        [network]
        reconnect_initial_backoff_ms = 5000
        reconnect_max_backoff_ms = 1000
    "#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        ..Default::default()
    };
    let err = Config::load(&cli).unwrap_err();
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::BackoffRange {
            initial: 5000,
            max: 1000
        })
    );
}

#[test]
fn test_default_config_is_valid() {
    assert_eq!(Config::default().validate(), Ok(()));
}

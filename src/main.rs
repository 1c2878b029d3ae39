//! SodaCert - Certificate Transparency keyword monitor
//!
//! Watches the CertStream feed for certificates whose common name contains a
//! suspicious keyword and keeps a persistent list of the matching domains.

use anyhow::{Context, Result};
use clap::Parser;
use sodacert::{app::App, cli::Cli, config::Config, persistence::dedupe_domains_file};
use std::path::Path;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Routes log records to `config.log_file`; stdout belongs to the operator UI.
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    let log_file = &config.log_file;
    let directory = log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .with_context(|| format!("Invalid log file path: {}", log_file.display()))?;
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory: {}", directory.display()))?;

    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("Invalid log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.dedupe {
        let report = dedupe_domains_file(&config.output.path).await?;
        println!(
            "{}: kept {} domains, removed {} duplicates",
            config.output.path.display(),
            report.kept,
            report.removed
        );
        return Ok(());
    }

    let app = App::builder(config).build().await?;
    app.run().await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    let guard = init_logging(&config).unwrap_or_else(|err| {
        eprintln!("Failed to initialize logging: {:#}", err);
        std::process::exit(1);
    });

    info!("SodaCert starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("CertStream URL: {}", config.network.certstream_url);
    info!("Keywords: {}", config.matching.keywords.join(", "));
    info!("Output File: {}", config.output.path.display());
    info!("Persistence Interval: {}ms", config.persistence.interval_ms);
    info!("Live View Refresh: {}ms", config.viewer.refresh_ms);
    info!("-------------------------------------------------------");

    let code = match run(cli, config).await {
        Ok(()) => {
            info!("SodaCert exiting.");
            0
        }
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("sodacert: {:#}", e);
            1
        }
    };

    // The stdin reader may still be parked on a blocking read, so the runtime
    // is not waited on; flush the log writer and leave.
    drop(guard);
    std::process::exit(code);
}

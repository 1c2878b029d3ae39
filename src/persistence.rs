//! Append-only persistence of plain domain matches.
//!
//! The output file holds one domain per line. A [`PersistedLineSet`] seeded
//! from the file at startup records what has already been written, so each
//! distinct domain is appended at most once, across ticks and across runs.

use crate::internal_metrics::Metrics;
use crate::store::DomainStore;
use crate::utils::heartbeat::run_heartbeat;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

/// The set of lines already present in the output file.
///
/// Grows monotonically; nothing is ever removed.
#[derive(Debug, Default)]
pub struct PersistedLineSet {
    lines: HashSet<String>,
    /// The file's last line has no terminating newline yet.
    needs_newline: bool,
}

impl PersistedLineSet {
    /// Seeds the set from the existing contents of `path`.
    ///
    /// A missing file yields an empty set. Any other read error is returned.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read output file: {}", path.display()))
            }
        };

        let lines = content
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            lines,
            needs_newline: !content.is_empty() && !content.ends_with('\n'),
        })
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.contains(line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Periodically appends newly discovered plain domains to the output file.
pub struct PersistenceWriter {
    path: PathBuf,
    store: Arc<DomainStore>,
    persisted: PersistedLineSet,
    /// How far into the plain set earlier ticks have got.
    cursor: usize,
    metrics: Metrics,
}

impl PersistenceWriter {
    pub fn new(
        path: PathBuf,
        store: Arc<DomainStore>,
        persisted: PersistedLineSet,
        metrics: Metrics,
    ) -> Self {
        Self {
            path,
            store,
            persisted,
            cursor: 0,
            metrics,
        }
    }

    pub fn persisted(&self) -> &PersistedLineSet {
        &self.persisted
    }

    /// Runs one persistence tick against a snapshot of the plain set.
    ///
    /// Only the entries added since the last successful tick are read; the
    /// set is append-only, so that tail holds everything new. Domains
    /// inserted after the snapshot is taken are picked up next tick.
    ///
    /// # Returns
    /// * `Ok(n)` with the number of lines appended
    /// * `Err` if the output file could not be opened or written
    pub async fn tick(&mut self) -> Result<usize> {
        let tail = self.store.plain().snapshot_from(self.cursor);
        let written = self.persist(tail.iter().map(String::as_str)).await?;
        self.cursor += tail.len();
        Ok(written)
    }

    /// Appends every domain in `domains` that has not been written yet.
    ///
    /// The file is opened in create/append mode only when there is something
    /// to write, through a single buffered writer flushed before returning.
    pub async fn persist<'a, I>(&mut self, domains: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let pending: Vec<&str> = domains
            .into_iter()
            .filter(|domain| !self.persisted.contains(domain) && seen.insert(*domain))
            .collect();

        if pending.is_empty() {
            return Ok(0);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open output file: {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        if self.persisted.needs_newline {
            writer.write_all(b"\n").await?;
        }
        for domain in &pending {
            writer.write_all(domain.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        writer
            .flush()
            .await
            .with_context(|| format!("Failed to write output file: {}", self.path.display()))?;

        self.persisted.needs_newline = false;
        for domain in &pending {
            self.persisted.lines.insert(domain.to_string());
        }

        let written = pending.len();
        self.metrics.domains_persisted_total.increment(written as u64);
        debug!(written, total = self.persisted.len(), "Persisted new domains");
        Ok(written)
    }

    /// Ticks every `interval` until shutdown.
    ///
    /// An I/O failure is unrecoverable: it is reported on `fatal_tx` and the
    /// task stops. On shutdown one last tick is attempted.
    pub async fn run(
        mut self,
        interval: Duration,
        mut shutdown_rx: watch::Receiver<bool>,
        fatal_tx: mpsc::UnboundedSender<anyhow::Error>,
    ) {
        let hb_shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move { run_heartbeat("PersistenceWriter", hb_shutdown_rx).await });

        info!("Persistence writer started for {}", self.path.display());
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Persistence writer received shutdown signal.");
                    if let Err(e) = self.tick().await {
                        error!("Final persistence tick failed: {:#}", e);
                    }
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Persistence writer failed: {:#}", e);
                        let _ = fatal_tx.send(e);
                        break;
                    }
                }
            }
        }
        info!("Persistence writer finished.");
    }
}

/// The outcome of [`dedupe_domains_file`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupeReport {
    pub kept: usize,
    pub removed: usize,
}

/// Rewrites the output file so each line appears once, keeping the first
/// occurrence of every line in its original position.
///
/// Files appended by several runs can contain repeats; this pass removes them.
/// The new contents are written next to the file and renamed over it.
pub async fn dedupe_domains_file(path: &Path) -> Result<DedupeReport> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(DedupeReport::default()),
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to read output file: {}", path.display()))
        }
    };

    let mut seen = HashSet::new();
    let mut report = DedupeReport::default();
    let mut output = String::with_capacity(content.len());
    for line in content.lines().filter(|line| !line.is_empty()) {
        if seen.insert(line) {
            output.push_str(line);
            output.push('\n');
            report.kept += 1;
        } else {
            report.removed += 1;
        }
    }

    let tmp_path = path.with_extension("dedupe.tmp");
    fs::write(&tmp_path, output)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    info!(kept = report.kept, removed = report.removed, "Deduplicated {}", path.display());
    Ok(report)
}

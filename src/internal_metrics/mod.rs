//! # Internal Metrics Module
//!
//! Application metrics are recorded through the `metrics` facade. No exporter
//! is installed by the binary, so recording is a no-op unless an embedding
//! program sets a global recorder before building the app.
//!
//! - **`Metrics`**: A lightweight, cloneable struct holding handles to the
//!   pipeline's counters, so call sites don't repeat metric names.

use metrics::{Counter, Unit};

/// The public API for the metrics system.
#[derive(Clone)]
pub struct Metrics {
    pub events_received_total: Counter,
    pub events_malformed_total: Counter,
    pub domains_matched_total: Counter,
    pub punycode_decode_failures_total: Counter,
    pub domains_persisted_total: Counter,
    pub websocket_disconnects_total: Counter,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance and registers descriptions for all
    /// supported metrics with the global recorder.
    pub fn new() -> Self {
        metrics::describe_counter!("events_received_total", Unit::Count, "Total number of certificate events received from the feed, heartbeats excluded.");
        metrics::describe_counter!("events_malformed_total", Unit::Count, "Total number of feed messages that could not be decoded.");
        metrics::describe_counter!("domains_matched_total", Unit::Count, "Total number of common names that matched a keyword, duplicates included.");
        metrics::describe_counter!("punycode_decode_failures_total", Unit::Count, "Total number of matched common names dropped because their punycode labels failed to decode.");
        metrics::describe_counter!("domains_persisted_total", Unit::Count, "Total number of domains appended to the output file.");
        metrics::describe_counter!("websocket_disconnects_total", Unit::Count, "Total number of times the feed websocket has disconnected.");
        metrics::describe_gauge!("plain_domains", Unit::Count, "Number of unique plain domains held in memory.");
        metrics::describe_gauge!("punycode_domains", Unit::Count, "Number of unique decoded punycode domains held in memory.");

        Self {
            events_received_total: metrics::counter!("events_received_total"),
            events_malformed_total: metrics::counter!("events_malformed_total"),
            domains_matched_total: metrics::counter!("domains_matched_total"),
            punycode_decode_failures_total: metrics::counter!("punycode_decode_failures_total"),
            domains_persisted_total: metrics::counter!("domains_persisted_total"),
            websocket_disconnects_total: metrics::counter!("websocket_disconnects_total"),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

//! The feed listener stage: classify each certificate event and record
//! newly seen domains in the shared store.

use crate::core::{CertEvent, Domain};
use crate::internal_metrics::Metrics;
use crate::matching::KeywordClassifier;
use crate::store::DomainStore;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Applies the keyword classifier to feed events and appends matches to the
/// [`DomainStore`].
///
/// Every failure is handled here, so a bad event never stops the feed.
pub struct FeedListener {
    classifier: Arc<KeywordClassifier>,
    store: Arc<DomainStore>,
    metrics: Metrics,
}

impl FeedListener {
    pub fn new(
        classifier: Arc<KeywordClassifier>,
        store: Arc<DomainStore>,
        metrics: Metrics,
    ) -> Self {
        Self {
            classifier,
            store,
            metrics,
        }
    }

    /// Processes a single event.
    ///
    /// # Returns
    /// * `Some(domain)` if the event produced a domain that was not seen before
    /// * `None` for heartbeats, non-matching names, decode failures, names
    ///   carrying control characters and repeats
    pub fn handle_event(&self, event: &CertEvent) -> Option<Domain> {
        if event.is_heartbeat() {
            trace!("Skipping heartbeat message");
            return None;
        }
        self.metrics.events_received_total.increment(1);

        let domain = match self.classifier.classify(&event.common_name) {
            Ok(Some(domain)) => domain,
            Ok(None) => return None,
            Err(e) => {
                self.metrics.punycode_decode_failures_total.increment(1);
                warn!("Dropping matched common name: {}", e);
                return None;
            }
        };
        // One domain per output line: a line break or other control
        // character would split it and defeat the restart seeding.
        if domain.as_str().chars().any(char::is_control) {
            self.metrics.events_malformed_total.increment(1);
            warn!(domain = ?domain.as_str(), "Dropping common name with control characters");
            return None;
        }
        self.metrics.domains_matched_total.increment(1);

        if self.store.insert(&domain) {
            debug!(domain = %domain, punycode = domain.is_punycode(), "New domain discovered");
            Some(domain)
        } else {
            trace!(domain = %domain, "Domain already known");
            None
        }
    }

    pub fn store(&self) -> &Arc<DomainStore> {
        &self.store
    }
}

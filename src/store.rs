//! In-memory deduplicated domain sets shared by all tasks.
//!
//! The feed listener is the only writer. The persistence writer and the live
//! viewer read point-in-time snapshots, so every reader observes a consistent
//! length and contents even while inserts continue.

use crate::core::Domain;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct DedupInner {
    /// Values in discovery order.
    items: Vec<String>,
    /// Presence index over `items`.
    index: HashSet<String>,
}

/// An ordered, duplicate-free, append-only set of strings.
#[derive(Debug, Default)]
pub struct DedupSet {
    inner: RwLock<DedupInner>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` unless an equal value is already present.
    ///
    /// # Returns
    /// * `true` if the value was newly inserted
    /// * `false` if it was already present
    pub fn insert_if_absent(&self, value: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.index.contains(value) {
            return false;
        }
        inner.index.insert(value.to_string());
        inner.items.push(value.to_string());
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .index
            .contains(value)
    }

    /// Returns a copy of the current contents in discovery order.
    pub fn snapshot(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .clone()
    }

    /// Returns a copy of the entries from position `start` onwards.
    ///
    /// Entries are never reordered or removed, so a reader that remembers
    /// how far it got only needs this tail on its next pass.
    pub fn snapshot_from(&self, start: usize) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.items.get(start..).map(<[String]>::to_vec).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .items
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The process-wide pipeline state: one dedup set per domain variant.
///
/// Constructed once at startup and shared by reference (`Arc`) with every task.
#[derive(Debug, Default)]
pub struct DomainStore {
    plain: DedupSet,
    punycode: DedupSet,
}

impl DomainStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a classified domain into the set matching its variant.
    ///
    /// Returns `true` if the domain was not seen before.
    pub fn insert(&self, domain: &Domain) -> bool {
        let inserted = self.set_for(domain).insert_if_absent(domain.as_str());
        if inserted {
            metrics::gauge!("plain_domains").set(self.plain.len() as f64);
            metrics::gauge!("punycode_domains").set(self.punycode.len() as f64);
        }
        inserted
    }

    /// Plain (non-IDNA) matches in discovery order.
    pub fn plain(&self) -> &DedupSet {
        &self.plain
    }

    /// Decoded IDNA matches in discovery order.
    pub fn punycode(&self) -> &DedupSet {
        &self.punycode
    }

    fn set_for(&self, domain: &Domain) -> &DedupSet {
        match domain {
            Domain::Plain(_) => &self.plain,
            Domain::Punycode(_) => &self.punycode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_insert_if_absent_rejects_duplicates() {
        let set = DedupSet::new();
        assert!(set.insert_if_absent("hacking-bank.example.com"));
        assert!(!set.insert_if_absent("hacking-bank.example.com"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_first_occurrence_order_is_kept() {
        let set = DedupSet::new();
        for value in ["b", "a", "b", "c", "a", "d", "c"] {
            set.insert_if_absent(value);
        }
        assert_eq!(set.snapshot(), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_snapshot_from_returns_tail() {
        let set = DedupSet::new();
        for value in ["one", "two", "three"] {
            set.insert_if_absent(value);
        }
        assert_eq!(set.snapshot_from(1), vec!["two", "three"]);
        assert!(set.snapshot_from(3).is_empty());
        assert!(set.snapshot_from(10).is_empty());
    }

    #[test]
    fn test_store_routes_by_variant() {
        let store = DomainStore::new();
        assert!(store.insert(&Domain::Plain("meth.example".to_string())));
        assert!(store.insert(&Domain::Punycode("cardingü.com".to_string())));
        // Same text, other variant: tracked independently.
        assert!(store.insert(&Domain::Punycode("meth.example".to_string())));
        assert!(!store.insert(&Domain::Plain("meth.example".to_string())));

        assert_eq!(store.plain().snapshot(), vec!["meth.example"]);
        assert_eq!(
            store.punycode().snapshot(),
            vec!["cardingü.com", "meth.example"]
        );
    }

    #[test]
    fn test_concurrent_inserts_keep_each_value_once() {
        let set = Arc::new(DedupSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = set.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        set.insert_if_absent(&format!("domain-{i}.com"));
                    }
                })
            })
            .collect();

        // A reader running alongside the writers always sees a consistent prefix.
        for _ in 0..50 {
            let snapshot = set.snapshot();
            let unique: HashSet<_> = snapshot.iter().collect();
            assert_eq!(unique.len(), snapshot.len());
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(set.len(), 200);
    }
}

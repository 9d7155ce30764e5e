//! Listener registry: handler bindings kept sorted by descending priority,
//! registration order preserved within a priority band.
//!
//! Each binding owns a counting semaphore (its concurrency gate) and one
//! [`CircuitBreaker`] per `(root, version)` pair it has dispatched to —
//! created lazily, the first time that pair is seen.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use swarmbus_gate::{CircuitBreaker, CircuitBreakerConfig};
use tokio::sync::Semaphore;

pub type HandlerFuture = Pin<Box<dyn Future<Output = anyhow::Result<Option<Vec<u8>>>> + Send>>;
pub type HandlerFn = Arc<dyn Fn(Vec<u8>) -> HandlerFuture + Send + Sync>;

/// A listener's accepted version: either an exact string or the wildcard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionMatch {
    Exact(String),
    Wildcard,
}

impl VersionMatch {
    pub fn matches(&self, version: Option<&str>) -> bool {
        match self {
            VersionMatch::Wildcard => true,
            VersionMatch::Exact(expected) => Some(expected.as_str()) == version,
        }
    }
}

/// One registered handler binding.
pub struct ListenerBinding {
    pub id: u64,
    pub roots: Vec<String>,
    pub version: VersionMatch,
    pub priority: i32,
    pub handler: HandlerFn,
    pub semaphore: Arc<Semaphore>,
    circuits: Mutex<HashMap<(String, String), CircuitBreaker>>,
}

impl ListenerBinding {
    pub fn accepts_root(&self, root: &str) -> bool {
        self.roots.iter().any(|r| r == root)
    }

    pub fn matches(&self, root: &str, version: Option<&str>) -> bool {
        self.accepts_root(root) && self.version.matches(version)
    }

    /// Probes (and potentially advances) this listener's circuit for
    /// `(root, version)`. Creates the circuit lazily on first use.
    pub fn circuit_is_open(&self, root: &str, version: &str) -> bool {
        let mut circuits = self.circuits.lock().expect("circuit map mutex poisoned");
        circuits
            .entry((root.to_string(), version.to_string()))
            .or_insert_with(|| CircuitBreaker::new(CircuitBreakerConfig::default()))
            .is_open()
    }

    pub fn record_success(&self, root: &str, version: &str) {
        let mut circuits = self.circuits.lock().expect("circuit map mutex poisoned");
        circuits
            .entry((root.to_string(), version.to_string()))
            .or_insert_with(|| CircuitBreaker::new(CircuitBreakerConfig::default()))
            .record_success();
    }

    pub fn record_failure(&self, root: &str, version: &str) {
        let mut circuits = self.circuits.lock().expect("circuit map mutex poisoned");
        circuits
            .entry((root.to_string(), version.to_string()))
            .or_insert_with(|| CircuitBreaker::new(CircuitBreakerConfig::default()))
            .record_failure();
    }
}

/// Registry of listener bindings, kept sorted by descending priority.
pub struct ListenerRegistry {
    listeners: Mutex<Vec<Arc<ListenerBinding>>>,
    max_concurrent_per_listener: usize,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    pub fn new(max_concurrent_per_listener: usize) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            max_concurrent_per_listener,
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a new binding and re-sorts by descending priority. The
    /// sort is stable, so ties keep registration order.
    pub fn register(&self, roots: Vec<String>, version: VersionMatch, priority: i32, handler: HandlerFn) -> Arc<ListenerBinding> {
        let binding = Arc::new(ListenerBinding {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            roots,
            version,
            priority,
            handler,
            semaphore: Arc::new(Semaphore::new(self.max_concurrent_per_listener)),
            circuits: Mutex::new(HashMap::new()),
        });

        let mut listeners = self.listeners.lock().expect("listener list mutex poisoned");
        listeners.push(binding.clone());
        listeners.sort_by_key(|l| std::cmp::Reverse(l.priority));
        binding
    }

    /// Every binding matching `(root, version)`, in descending-priority
    /// order (the order dispatch must respect for `cardinality = one`).
    pub fn matching(&self, root: &str, version: Option<&str>) -> Vec<Arc<ListenerBinding>> {
        let listeners = self.listeners.lock().expect("listener list mutex poisoned");
        listeners.iter().filter(|l| l.matches(root, version)).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().expect("listener list mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_handler() -> HandlerFn {
        Arc::new(|_xml| Box::pin(async { Ok(None) }))
    }

    #[test]
    fn matching_filters_by_root_and_version() {
        let registry = ListenerRegistry::new(10);
        registry.register(vec!["cad-task".to_string()], VersionMatch::Exact("1.0".to_string()), 0, noop_handler());

        assert_eq!(registry.matching("cad-task", Some("1.0")).len(), 1);
        assert_eq!(registry.matching("cad-task", Some("2.0")).len(), 0);
        assert_eq!(registry.matching("other-root", Some("1.0")).len(), 0);
    }

    #[test]
    fn wildcard_version_matches_anything() {
        let registry = ListenerRegistry::new(10);
        registry.register(vec!["cad-task".to_string()], VersionMatch::Wildcard, 0, noop_handler());
        assert_eq!(registry.matching("cad-task", Some("9.9")).len(), 1);
        assert_eq!(registry.matching("cad-task", None).len(), 1);
    }

    #[test]
    fn sorted_descending_priority_stable_within_band() {
        let registry = ListenerRegistry::new(10);
        let low = registry.register(vec!["cad-task".to_string()], VersionMatch::Wildcard, 0, noop_handler());
        let high = registry.register(vec!["cad-task".to_string()], VersionMatch::Wildcard, 10, noop_handler());
        let mid_first = registry.register(vec!["cad-task".to_string()], VersionMatch::Wildcard, 5, noop_handler());
        let mid_second = registry.register(vec!["cad-task".to_string()], VersionMatch::Wildcard, 5, noop_handler());

        let matched = registry.matching("cad-task", None);
        let ids: Vec<u64> = matched.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![high.id, mid_first.id, mid_second.id, low.id]);
    }

    #[test]
    fn circuit_opens_after_threshold_failures() {
        let registry = ListenerRegistry::new(10);
        let listener = registry.register(vec!["cad-task".to_string()], VersionMatch::Wildcard, 0, noop_handler());
        for _ in 0..5 {
            listener.record_failure("cad-task", "1.0");
        }
        assert!(listener.circuit_is_open("cad-task", "1.0"));
        assert!(!listener.circuit_is_open("other-root", "1.0"));
    }
}

//! Subscription Registry — who is listening to which alert name.
//!
//! Alert names are not first-class objects, only labels: a subscription is
//! created implicitly by the first `register` for a (backend, name) pair and
//! there is nothing to delete when the last subscriber leaves.
//!
//! Two indices are maintained:
//! - name → backends, used by the commit fan-out
//! - backend → sorted names, used by `wait_any` scans (sorted so that ties
//!   between same-commit signals resolve by lexical name order)
//!
//! Not internally synchronized; lives inside the broker state mutex.

use std::collections::BTreeSet;

use fxhash::{FxHashMap, FxHashSet};

use super::BackendId;

/// Registry of (backend, alert-name) subscriptions.
///
/// `register` is idempotent; `remove` and `remove_all` are no-ops when the
/// subscription is absent.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    /// Index: alert name → subscribed backends.
    by_name: FxHashMap<String, FxHashSet<BackendId>>,
    /// Index: backend → subscribed names, lexically sorted.
    by_backend: FxHashMap<BackendId, BTreeSet<String>>,
}

impl SubscriptionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription. Returns `true` if it did not already exist.
    pub fn register(&mut self, backend: BackendId, name: &str) -> bool {
        let inserted = self
            .by_name
            .entry(name.to_owned())
            .or_default()
            .insert(backend);
        if inserted {
            self.by_backend
                .entry(backend)
                .or_default()
                .insert(name.to_owned());
        }
        inserted
    }

    /// Removes a single subscription. Returns `true` if it existed.
    pub fn remove(&mut self, backend: BackendId, name: &str) -> bool {
        let removed = match self.by_name.get_mut(name) {
            Some(backends) => {
                let removed = backends.remove(&backend);
                if backends.is_empty() {
                    self.by_name.remove(name);
                }
                removed
            }
            None => false,
        };
        if removed {
            if let Some(names) = self.by_backend.get_mut(&backend) {
                names.remove(name);
                if names.is_empty() {
                    self.by_backend.remove(&backend);
                }
            }
        }
        removed
    }

    /// Removes every subscription held by `backend`. Returns how many existed.
    pub fn remove_all(&mut self, backend: BackendId) -> usize {
        let Some(names) = self.by_backend.remove(&backend) else {
            return 0;
        };
        for name in &names {
            if let Some(backends) = self.by_name.get_mut(name) {
                backends.remove(&backend);
                if backends.is_empty() {
                    self.by_name.remove(name);
                }
            }
        }
        names.len()
    }

    /// Returns whether `backend` is subscribed to `name`.
    #[must_use]
    pub fn is_registered(&self, backend: BackendId, name: &str) -> bool {
        self.by_name
            .get(name)
            .is_some_and(|backends| backends.contains(&backend))
    }

    /// Returns the backends subscribed to `name`.
    pub fn subscribers(&self, name: &str) -> impl Iterator<Item = BackendId> + '_ {
        self.by_name.get(name).into_iter().flatten().copied()
    }

    /// Returns the names subscribed by `backend`, lexically sorted.
    #[must_use]
    pub fn names_for(&self, backend: BackendId) -> Option<&BTreeSet<String>> {
        self.by_backend.get(&backend)
    }

    /// Total number of (backend, name) subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.by_backend.values().map(BTreeSet::len).sum()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const A: BackendId = BackendId(1);
    const B: BackendId = BackendId(2);

    // --- Register tests ---

    #[test]
    fn test_register_creates_subscription() {
        let mut reg = SubscriptionRegistry::new();
        assert!(reg.register(A, "ORD_READY"));
        assert!(reg.is_registered(A, "ORD_READY"));
        assert_eq!(reg.subscription_count(), 1);
    }

    #[test]
    fn test_register_idempotent() {
        let mut reg = SubscriptionRegistry::new();
        assert!(reg.register(A, "ORD_READY"));
        assert!(!reg.register(A, "ORD_READY"));
        assert_eq!(reg.subscription_count(), 1);
    }

    #[test]
    fn test_register_case_sensitive_names() {
        let mut reg = SubscriptionRegistry::new();
        reg.register(A, "ord_ready");
        assert!(!reg.is_registered(A, "ORD_READY"));
        assert!(reg.is_registered(A, "ord_ready"));
    }

    // --- Remove tests ---

    #[test]
    fn test_remove_existing() {
        let mut reg = SubscriptionRegistry::new();
        reg.register(A, "ORD_READY");
        assert!(reg.remove(A, "ORD_READY"));
        assert!(!reg.is_registered(A, "ORD_READY"));
        assert_eq!(reg.subscription_count(), 0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut reg = SubscriptionRegistry::new();
        assert!(!reg.remove(A, "ORD_READY"));
        reg.register(A, "ORD_READY");
        assert!(!reg.remove(B, "ORD_READY"));
        assert!(reg.is_registered(A, "ORD_READY"));
    }

    #[test]
    fn test_remove_all() {
        let mut reg = SubscriptionRegistry::new();
        reg.register(A, "x");
        reg.register(A, "y");
        reg.register(B, "x");

        assert_eq!(reg.remove_all(A), 2);
        assert_eq!(reg.subscription_count(), 1);
        assert!(reg.is_registered(B, "x"));
        assert!(reg.names_for(A).is_none());

        // Second call is a no-op
        assert_eq!(reg.remove_all(A), 0);
    }

    // --- Index tests ---

    #[test]
    fn test_subscribers_fan_out_set() {
        let mut reg = SubscriptionRegistry::new();
        reg.register(A, "x");
        reg.register(B, "x");
        reg.register(B, "y");

        let mut subs: Vec<_> = reg.subscribers("x").collect();
        subs.sort_unstable_by_key(|b| b.0);
        assert_eq!(subs, vec![A, B]);
        assert_eq!(reg.subscribers("y").count(), 1);
        assert_eq!(reg.subscribers("z").count(), 0);
    }

    #[test]
    fn test_names_for_sorted() {
        let mut reg = SubscriptionRegistry::new();
        reg.register(A, "zeta");
        reg.register(A, "alpha");
        reg.register(A, "mid");

        let names: Vec<_> = reg.names_for(A).unwrap().iter().cloned().collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_name_index_dropped() {
        let mut reg = SubscriptionRegistry::new();
        reg.register(A, "x");
        reg.remove(A, "x");
        // Name entry fully cleaned up, not left as an empty set
        assert_eq!(reg.subscribers("x").count(), 0);
        assert!(reg.by_name.is_empty());
        assert!(reg.by_backend.is_empty());
    }
}

//! Pending-Signal Store — per-backend mailboxes of undelivered signals.
//!
//! Broadcast-not-queue semantics: a mailbox holds at most one pending signal
//! per alert name. A newer signal for the same (backend, name) pair overwrites
//! an undelivered older one (last-write-wins coalescing).
//!
//! Every signal carries the commit sequence of the transaction that flushed
//! it. All entries fanned out by one commit share one sequence, so `wait_any`
//! ordering between them falls through to lexical name order.
//!
//! Not internally synchronized; lives inside the broker state mutex.

use std::time::Instant;

use fxhash::FxHashMap;

use super::BackendId;

/// An undelivered signal sitting in a backend's mailbox.
#[derive(Debug, Clone)]
pub struct PendingSignal {
    /// Message payload attached by the signaler.
    pub message: String,
    /// Commit sequence of the flushing transaction.
    pub seq: u64,
    /// Instant the signal was placed in the mailbox.
    pub enqueued_at: Instant,
}

/// Store of per-backend mailboxes, keyed by alert name.
#[derive(Debug, Default)]
pub struct PendingStore {
    mailboxes: FxHashMap<BackendId, FxHashMap<String, PendingSignal>>,
}

impl PendingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Posts a signal into a backend's mailbox, overwriting any undelivered
    /// signal for the same alert name.
    pub fn post(&mut self, backend: BackendId, name: &str, message: String, seq: u64, now: Instant) {
        self.mailboxes.entry(backend).or_default().insert(
            name.to_owned(),
            PendingSignal {
                message,
                seq,
                enqueued_at: now,
            },
        );
    }

    /// Removes and returns the pending signal for (backend, name), if any.
    pub fn take(&mut self, backend: BackendId, name: &str) -> Option<PendingSignal> {
        let mailbox = self.mailboxes.get_mut(&backend)?;
        let signal = mailbox.remove(name);
        if mailbox.is_empty() {
            self.mailboxes.remove(&backend);
        }
        signal
    }

    /// Removes and returns the earliest pending signal among `names`.
    ///
    /// Earliest means the lowest commit sequence; `names` must be iterated in
    /// lexical order so that same-commit signals tie-break deterministically
    /// by alert name.
    pub fn take_earliest<'a, I>(&mut self, backend: BackendId, names: I) -> Option<(String, PendingSignal)>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mailbox = self.mailboxes.get_mut(&backend)?;

        let mut best: Option<(&'a String, u64)> = None;
        for name in names {
            if let Some(signal) = mailbox.get(name) {
                // Strictly-less keeps the lexically first name on equal seq
                if best.map_or(true, |(_, seq)| signal.seq < seq) {
                    best = Some((name, signal.seq));
                }
            }
        }

        let (name, _) = best?;
        let signal = mailbox.remove(name);
        if mailbox.is_empty() {
            self.mailboxes.remove(&backend);
        }
        signal.map(|s| (name.clone(), s))
    }

    /// Drops every pending signal owned by `backend`.
    pub fn clear_backend(&mut self, backend: BackendId) {
        self.mailboxes.remove(&backend);
    }

    /// Number of undelivered signals in a backend's mailbox.
    #[must_use]
    pub fn pending_count(&self, backend: BackendId) -> usize {
        self.mailboxes.get(&backend).map_or(0, FxHashMap::len)
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

    fn now() -> Instant {
        Instant::now()
    }

    // --- Post / take tests ---

    #[test]
    fn test_post_and_take() {
        let mut store = PendingStore::new();
        store.post(A, "x", "m1".into(), 1, now());

        let signal = store.take(A, "x").unwrap();
        assert_eq!(signal.message, "m1");
        assert_eq!(signal.seq, 1);

        // Delivered once; gone afterwards
        assert!(store.take(A, "x").is_none());
    }

    #[test]
    fn test_take_wrong_backend_or_name() {
        let mut store = PendingStore::new();
        store.post(A, "x", "m1".into(), 1, now());

        assert!(store.take(B, "x").is_none());
        assert!(store.take(A, "y").is_none());
        assert!(store.take(A, "x").is_some());
    }

    #[test]
    fn test_coalescing_last_write_wins() {
        let mut store = PendingStore::new();
        store.post(A, "x", "old".into(), 1, now());
        store.post(A, "x", "new".into(), 2, now());

        assert_eq!(store.pending_count(A), 1);
        let signal = store.take(A, "x").unwrap();
        assert_eq!(signal.message, "new");
        assert_eq!(signal.seq, 2);
    }

    #[test]
    fn test_mailboxes_independent() {
        let mut store = PendingStore::new();
        store.post(A, "x", "for-a".into(), 1, now());
        store.post(B, "x", "for-b".into(), 1, now());

        assert_eq!(store.take(A, "x").unwrap().message, "for-a");
        assert_eq!(store.take(B, "x").unwrap().message, "for-b");
    }

    // --- take_earliest tests ---

    #[test]
    fn test_take_earliest_by_seq() {
        let mut store = PendingStore::new();
        store.post(A, "later", "m2".into(), 5, now());
        store.post(A, "earlier", "m1".into(), 3, now());

        let names: Vec<String> = vec!["earlier".into(), "later".into()];
        let (name, signal) = store.take_earliest(A, &names).unwrap();
        assert_eq!(name, "earlier");
        assert_eq!(signal.message, "m1");

        let (name, _) = store.take_earliest(A, &names).unwrap();
        assert_eq!(name, "later");

        assert!(store.take_earliest(A, &names).is_none());
    }

    #[test]
    fn test_take_earliest_lexical_tie_break() {
        let mut store = PendingStore::new();
        // Same commit sequence: one transaction signalled both names
        store.post(A, "zeta", "z".into(), 7, now());
        store.post(A, "alpha", "a".into(), 7, now());

        let names: Vec<String> = vec!["alpha".into(), "zeta".into()];
        let (first, _) = store.take_earliest(A, &names).unwrap();
        assert_eq!(first, "alpha");
        let (second, _) = store.take_earliest(A, &names).unwrap();
        assert_eq!(second, "zeta");
    }

    #[test]
    fn test_take_earliest_only_listed_names() {
        let mut store = PendingStore::new();
        store.post(A, "listed", "m1".into(), 2, now());
        store.post(A, "unlisted", "m2".into(), 1, now());

        let names: Vec<String> = vec!["listed".into()];
        let (name, _) = store.take_earliest(A, &names).unwrap();
        assert_eq!(name, "listed");

        // The unlisted signal stays pending
        assert_eq!(store.pending_count(A), 1);
    }

    // --- Clear tests ---

    #[test]
    fn test_clear_backend() {
        let mut store = PendingStore::new();
        store.post(A, "x", "m1".into(), 1, now());
        store.post(A, "y", "m2".into(), 2, now());
        store.post(B, "x", "m3".into(), 3, now());

        store.clear_backend(A);
        assert_eq!(store.pending_count(A), 0);
        assert_eq!(store.pending_count(B), 1);
    }
}

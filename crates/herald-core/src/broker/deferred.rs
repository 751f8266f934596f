//! Deferred Signal Queue — transaction-scoped signal buffers.
//!
//! Signals raised during an in-flight transaction are held here and only
//! become visible to waiters when the transaction commits; a rollback
//! discards the whole buffer with no observable effect. This is what keeps
//! waiters from waking on conditions that never became true.
//!
//! A transaction that never signalled has no entry here. Not internally
//! synchronized; lives inside the broker state mutex.

use fxhash::FxHashMap;

use super::{BackendId, TxId};

/// A signal raised inside a still-open transaction.
#[derive(Debug, Clone)]
pub struct DeferredEntry {
    /// Alert name the signal targets.
    pub name: String,
    /// Message payload.
    pub message: String,
    /// Backend that raised the signal.
    pub sender: BackendId,
}

/// Per-transaction queues of deferred signals.
#[derive(Debug, Default)]
pub struct DeferredQueues {
    queues: FxHashMap<TxId, Vec<DeferredEntry>>,
}

impl DeferredQueues {
    /// Creates an empty set of queues.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a deferred signal to `tx`'s queue.
    pub fn push(&mut self, tx: TxId, entry: DeferredEntry) {
        self.queues.entry(tx).or_default().push(entry);
    }

    /// Drains `tx`'s queue for commit-time fan-out, in signal order.
    pub fn drain(&mut self, tx: TxId) -> Vec<DeferredEntry> {
        self.queues.remove(&tx).unwrap_or_default()
    }

    /// Discards `tx`'s queue on rollback. Returns how many signals were dropped.
    pub fn discard(&mut self, tx: TxId) -> usize {
        self.queues.remove(&tx).map_or(0, |q| q.len())
    }

    /// Number of signals deferred by `tx` so far.
    #[must_use]
    pub fn deferred_count(&self, tx: TxId) -> usize {
        self.queues.get(&tx).map_or(0, Vec::len)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SENDER: BackendId = BackendId(9);

    fn entry(name: &str, message: &str) -> DeferredEntry {
        DeferredEntry {
            name: name.into(),
            message: message.into(),
            sender: SENDER,
        }
    }

    #[test]
    fn test_push_and_drain_preserves_order() {
        let mut queues = DeferredQueues::new();
        let tx = TxId(1);
        queues.push(tx, entry("a", "m1"));
        queues.push(tx, entry("b", "m2"));
        assert_eq!(queues.deferred_count(tx), 2);

        let drained = queues.drain(tx);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].name, "a");
        assert_eq!(drained[1].name, "b");

        // Drained wholesale; nothing left
        assert_eq!(queues.deferred_count(tx), 0);
        assert!(queues.drain(tx).is_empty());
    }

    #[test]
    fn test_discard_drops_everything() {
        let mut queues = DeferredQueues::new();
        let tx = TxId(1);
        queues.push(tx, entry("a", "m1"));
        queues.push(tx, entry("a", "m2"));

        assert_eq!(queues.discard(tx), 2);
        assert!(queues.drain(tx).is_empty());
        assert_eq!(queues.discard(tx), 0);
    }

    #[test]
    fn test_transactions_isolated() {
        let mut queues = DeferredQueues::new();
        queues.push(TxId(1), entry("a", "m1"));
        queues.push(TxId(2), entry("a", "m2"));

        assert_eq!(queues.discard(TxId(1)), 1);
        let drained = queues.drain(TxId(2));
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].message, "m2");
    }

    #[test]
    fn test_untouched_transaction_is_empty() {
        let mut queues = DeferredQueues::new();
        assert_eq!(queues.deferred_count(TxId(42)), 0);
        assert!(queues.drain(TxId(42)).is_empty());
    }
}

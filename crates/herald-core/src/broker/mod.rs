//! # Transactional Alert Broker
//!
//! Named-event publish/subscribe with commit-deferred delivery, for backends
//! (database sessions) sharing one server process.
//!
//! ## Architecture
//!
//! ```text
//! signal(tx, ..)      on_commit(tx)              wait_one / wait_any
//! ┌──────────────┐    ┌─────────────────────┐    ┌──────────────────┐
//! │ DeferredQueue│──► │ SensitivityFilter   │──► │ PendingStore     │
//! │ (per tx)     │    │ then fan-out to     │    │ (per-backend     │
//! └──────────────┘    │ registered backends │    │  mailboxes)      │
//!        rollback ──► │ (atomic, one lock)  │    └──────────────────┘
//!        discards     └─────────────────────┘      condvar wakeups
//! ```
//!
//! All shared state (registry, mailboxes, deferred queues, debounce state)
//! sits behind one [`parking_lot::Mutex`], held only across mutations. Waiting
//! backends park on a [`parking_lot::Condvar`] that commit fan-out and session
//! teardown notify, so the lock is never held while blocked.
//!
//! ## Guarantees
//!
//! - A signal raised in a rolled-back transaction is never observed.
//! - One commit's fan-out is atomic: a wait poll that begins after
//!   [`AlertBroker::on_commit`] returns sees all of its deliveries.
//! - A pending signal either fully satisfies one wait call or stays pending;
//!   there is no torn delivery.

mod deferred;
mod pending;
mod registry;
mod sensitivity;

pub use deferred::{DeferredEntry, DeferredQueues};
pub use pending::{PendingSignal, PendingStore};
pub use registry::SubscriptionRegistry;
pub use sensitivity::SensitivityFilter;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;

use crate::time::{Clock, SystemClock};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default sensitivity window applied when the embedder never calls
/// [`AlertBroker::set_sensitivity`].
pub const DEFAULT_SENSITIVITY: Duration = Duration::from_millis(100);

/// Upper bound on any wait, and the meaning of an unspecified timeout.
///
/// 86 400 000 seconds (1000 days), the historical `DBMS_ALERT.MAXWAIT`
/// bound. `wait_one`/`wait_any` with `timeout = None` block up to this long.
pub const MAX_WAIT: Duration = Duration::from_secs(86_400_000);

/// Maximum alert message length in bytes (the historical `DBMS_ALERT` cap).
pub const MAX_MESSAGE_LEN: usize = 1800;

// ---------------------------------------------------------------------------
// BackendId / TxId
// ---------------------------------------------------------------------------

/// Identifier of one backend (database session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(pub u64);

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "backend-{}", self.0)
    }
}

/// Identifier of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BrokerError
// ---------------------------------------------------------------------------

/// Errors reported synchronously by broker operations.
///
/// Argument validation never partially mutates state, and a wait timeout is
/// not an error (see [`WaitOutcome::TimedOut`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    /// Alert names are non-empty, case-sensitive strings.
    #[error("alert name must not be empty")]
    EmptyAlertName,

    /// Message exceeds [`MAX_MESSAGE_LEN`].
    #[error("alert message exceeds {MAX_MESSAGE_LEN} bytes (got {0})")]
    MessageTooLong(usize),

    /// The waiting backend was detached mid-wait (session closed).
    #[error("{0} is no longer attached")]
    SessionGone(BackendId),
}

// ---------------------------------------------------------------------------
// WaitOutcome
// ---------------------------------------------------------------------------

/// Terminal status of a `wait_one`/`wait_any` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A signal was consumed from the caller's mailbox.
    Delivered {
        /// Alert name the signal was raised on.
        name: String,
        /// Message attached by the signaler.
        message: String,
    },
    /// The deadline elapsed with no matching signal.
    TimedOut,
}

impl WaitOutcome {
    /// Returns `true` if a signal was delivered.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

// ---------------------------------------------------------------------------
// BrokerConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`AlertBroker`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Initial sensitivity (debounce) window.
    pub sensitivity: Duration,
    /// Whether a committed signal is also delivered to its own sender.
    /// Defaults to `true`, the historical `DBMS_ALERT` behavior.
    pub deliver_to_sender: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            deliver_to_sender: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AlertBroker
// ---------------------------------------------------------------------------

/// Shared broker state, guarded by the broker-wide mutex.
#[derive(Debug)]
struct BrokerState {
    registry: SubscriptionRegistry,
    pending: PendingStore,
    deferred: DeferredQueues,
    sensitivity: SensitivityFilter,
    /// Backends with a live session; waits for a detached backend abort.
    attached: fxhash::FxHashSet<BackendId>,
    /// Commit sequence counter; one value per commit so that a commit's
    /// fan-out orders as a unit in `wait_any`.
    next_seq: u64,
}

/// The broker: registry, mailboxes, deferred queues, debounce, wait engine.
///
/// Shared across backends as `Arc<AlertBroker>`. All operations are
/// synchronous; `wait_one`/`wait_any` block the calling thread.
pub struct AlertBroker {
    state: Mutex<BrokerState>,
    /// Signalled on commit fan-out and session teardown.
    wakeups: Condvar,
    deliver_to_sender: bool,
    clock: Arc<dyn Clock>,
}

impl AlertBroker {
    /// Creates a broker on the system clock.
    #[must_use]
    pub fn new(config: BrokerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a broker on an injected clock (deterministic tests).
    #[must_use]
    pub fn with_clock(config: BrokerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(BrokerState {
                registry: SubscriptionRegistry::new(),
                pending: PendingStore::new(),
                deferred: DeferredQueues::new(),
                sensitivity: SensitivityFilter::new(config.sensitivity),
                attached: fxhash::FxHashSet::default(),
                next_seq: 0,
            }),
            wakeups: Condvar::new(),
            deliver_to_sender: config.deliver_to_sender,
            clock,
        }
    }

    // --- session lifecycle -------------------------------------------------

    /// Attaches a backend. Idempotent; called once per session connect.
    pub fn attach(&self, backend: BackendId) {
        self.state.lock().attached.insert(backend);
        tracing::debug!(%backend, "backend attached");
    }

    /// Session lifecycle hook: tears down everything owned by `backend` and
    /// wakes its in-flight waits, which then return
    /// [`BrokerError::SessionGone`].
    pub fn on_session_end(&self, backend: BackendId) {
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let removed = state.registry.remove_all(backend);
            state.pending.clear_backend(backend);
            state.attached.remove(&backend);
            tracing::debug!(%backend, subscriptions = removed, "session ended");
        }
        self.wakeups.notify_all();
    }

    // --- registry operations -----------------------------------------------

    /// Subscribes `backend` to `name`. Idempotent.
    ///
    /// # Errors
    ///
    /// [`BrokerError::EmptyAlertName`] if `name` is empty.
    pub fn register(&self, backend: BackendId, name: &str) -> Result<(), BrokerError> {
        validate_name(name)?;
        let inserted = self.state.lock().registry.register(backend, name);
        if inserted {
            tracing::debug!(%backend, name, "alert registered");
        }
        Ok(())
    }

    /// Removes `backend`'s subscription to `name` and drops its undelivered
    /// signal for that name. No-op if absent.
    ///
    /// # Errors
    ///
    /// [`BrokerError::EmptyAlertName`] if `name` is empty.
    pub fn remove(&self, backend: BackendId, name: &str) -> Result<(), BrokerError> {
        validate_name(name)?;
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let removed = state.registry.remove(backend, name);
        state.pending.take(backend, name);
        drop(guard);
        if removed {
            tracing::debug!(%backend, name, "alert removed");
        }
        Ok(())
    }

    /// Removes all of `backend`'s subscriptions and pending signals.
    pub fn remove_all(&self, backend: BackendId) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let removed = state.registry.remove_all(backend);
        state.pending.clear_backend(backend);
        drop(guard);
        tracing::debug!(%backend, subscriptions = removed, "all alerts removed");
    }

    // --- signaling ---------------------------------------------------------

    /// Raises a signal on `name` inside transaction `tx`.
    ///
    /// The signal stays invisible in `tx`'s deferred queue until
    /// [`on_commit`](Self::on_commit) fans it out; a rollback discards it.
    ///
    /// # Errors
    ///
    /// [`BrokerError::EmptyAlertName`] if `name` is empty;
    /// [`BrokerError::MessageTooLong`] if `message` exceeds
    /// [`MAX_MESSAGE_LEN`] bytes.
    pub fn signal(
        &self,
        tx: TxId,
        sender: BackendId,
        name: &str,
        message: &str,
    ) -> Result<(), BrokerError> {
        validate_name(name)?;
        if message.len() > MAX_MESSAGE_LEN {
            return Err(BrokerError::MessageTooLong(message.len()));
        }
        self.state.lock().deferred.push(
            tx,
            DeferredEntry {
                name: name.to_owned(),
                message: message.to_owned(),
                sender,
            },
        );
        tracing::trace!(%tx, %sender, name, "signal deferred");
        Ok(())
    }

    /// Commit hook: fans out `tx`'s deferred signals to every currently
    /// subscribed backend, subject to the sensitivity filter, then wakes
    /// waiters. Atomic as a unit under the broker lock.
    ///
    /// Infallible by design: alerting is advisory and must never fail the
    /// underlying commit. Returns the number of mailbox deliveries written.
    pub fn on_commit(&self, tx: TxId) -> usize {
        let mut delivered = 0usize;
        let mut suppressed = 0usize;
        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let entries = state.deferred.drain(tx);
            if entries.is_empty() {
                return 0;
            }

            let now = self.clock.now();
            state.next_seq += 1;
            let seq = state.next_seq;

            for entry in entries {
                if state.sensitivity.should_suppress(&entry.name, now) {
                    suppressed += 1;
                    continue;
                }
                let recipients: SmallVec<[BackendId; 8]> = state
                    .registry
                    .subscribers(&entry.name)
                    .filter(|b| self.deliver_to_sender || *b != entry.sender)
                    .collect();
                for backend in recipients {
                    state
                        .pending
                        .post(backend, &entry.name, entry.message.clone(), seq, now);
                    delivered += 1;
                }
            }
        }
        if delivered > 0 {
            self.wakeups.notify_all();
        }
        tracing::debug!(%tx, delivered, suppressed, "commit fan-out");
        delivered
    }

    /// Rollback hook: discards `tx`'s deferred signals with no observable
    /// effect.
    pub fn on_rollback(&self, tx: TxId) {
        let discarded = self.state.lock().deferred.discard(tx);
        if discarded > 0 {
            tracing::debug!(%tx, discarded, "rollback discarded deferred signals");
        }
    }

    // --- wait engine ---------------------------------------------------------

    /// Blocks until a signal on `name` lands in `backend`'s mailbox, or the
    /// timeout elapses.
    ///
    /// `Some(Duration::ZERO)` checks once and returns immediately; `None`
    /// waits indefinitely, bounded by [`MAX_WAIT`]. The broker lock is
    /// released while parked.
    ///
    /// # Errors
    ///
    /// [`BrokerError::EmptyAlertName`] if `name` is empty;
    /// [`BrokerError::SessionGone`] if the backend is detached mid-wait.
    pub fn wait_one(
        &self,
        backend: BackendId,
        name: &str,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, BrokerError> {
        validate_name(name)?;
        let deadline = self.clock.now() + effective_timeout(timeout);

        let mut guard = self.state.lock();
        loop {
            if !guard.attached.contains(&backend) {
                return Err(BrokerError::SessionGone(backend));
            }
            if let Some(signal) = guard.pending.take(backend, name) {
                tracing::trace!(%backend, name, "wait_one delivered");
                return Ok(WaitOutcome::Delivered {
                    name: name.to_owned(),
                    message: signal.message,
                });
            }
            if self.clock.now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            self.wakeups.wait_until(&mut guard, deadline);
        }
    }

    /// Blocks until any signal on a name `backend` is registered for lands in
    /// its mailbox, or the timeout elapses.
    ///
    /// Among several pending signals the earliest commit wins; signals from
    /// the same commit tie-break by lexical name order. Timeout semantics
    /// match [`wait_one`](Self::wait_one).
    ///
    /// # Errors
    ///
    /// [`BrokerError::SessionGone`] if the backend is detached mid-wait.
    pub fn wait_any(
        &self,
        backend: BackendId,
        timeout: Option<Duration>,
    ) -> Result<WaitOutcome, BrokerError> {
        let deadline = self.clock.now() + effective_timeout(timeout);

        let mut guard = self.state.lock();
        loop {
            if !guard.attached.contains(&backend) {
                return Err(BrokerError::SessionGone(backend));
            }
            let state = &mut *guard;
            let taken = match state.registry.names_for(backend) {
                Some(names) => state.pending.take_earliest(backend, names),
                None => None,
            };
            if let Some((name, signal)) = taken {
                tracing::trace!(%backend, name, "wait_any delivered");
                return Ok(WaitOutcome::Delivered {
                    name,
                    message: signal.message,
                });
            }
            if self.clock.now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            self.wakeups.wait_until(&mut guard, deadline);
        }
    }

    // --- configuration and introspection -------------------------------------

    /// Updates the sensitivity window. Applies to future commits only.
    pub fn set_sensitivity(&self, threshold: Duration) {
        self.state.lock().sensitivity.set_threshold(threshold);
        tracing::debug!(?threshold, "sensitivity updated");
    }

    /// Current sensitivity window.
    #[must_use]
    pub fn sensitivity(&self) -> Duration {
        self.state.lock().sensitivity.threshold()
    }

    /// Total number of (backend, name) subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.state.lock().registry.subscription_count()
    }

    /// Number of undelivered signals in `backend`'s mailbox.
    #[must_use]
    pub fn pending_count(&self, backend: BackendId) -> usize {
        self.state.lock().pending.pending_count(backend)
    }
}

impl fmt::Debug for AlertBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertBroker")
            .field("deliver_to_sender", &self.deliver_to_sender)
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> Result<(), BrokerError> {
    if name.is_empty() {
        return Err(BrokerError::EmptyAlertName);
    }
    Ok(())
}

/// Clamps a caller timeout to the broker's wait bound. `None` waits the full
/// [`MAX_WAIT`].
fn effective_timeout(timeout: Option<Duration>) -> Duration {
    timeout.unwrap_or(MAX_WAIT).min(MAX_WAIT)
}

// ===========================================================================
// Tests
// ===========================================================================

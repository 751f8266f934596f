//! Per-backend session handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use herald_core::{AlertBroker, BackendId, TxId, WaitOutcome};

use crate::error::DbError;

/// One backend's handle onto the alert facility.
///
/// Registry operations and signaling act on behalf of this session's
/// backend; waits consume this backend's mailbox. Transaction scoping is
/// explicit (`begin`/`commit`/`rollback`); a `signal` outside any
/// transaction auto-wraps as a single-statement transaction that commits
/// immediately.
///
/// Dropping the session rolls back an open transaction and fires the
/// broker's session-end hook, releasing subscriptions, pending signals, and
/// any wait parked on this backend.
#[derive(Debug)]
pub struct Session {
    backend: BackendId,
    broker: Arc<AlertBroker>,
    tx_ids: Arc<AtomicU64>,
    current_tx: Option<TxId>,
    open: bool,
}

impl Session {
    pub(crate) fn new(backend: BackendId, broker: Arc<AlertBroker>, tx_ids: Arc<AtomicU64>) -> Self {
        Self {
            backend,
            broker,
            tx_ids,
            current_tx: None,
            open: true,
        }
    }

    /// This session's backend ID.
    #[must_use]
    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// The transaction currently open on this session, if any.
    #[must_use]
    pub fn current_tx(&self) -> Option<TxId> {
        self.current_tx
    }

    // --- registry operations -----------------------------------------------

    /// Subscribes this backend to `name`. Idempotent.
    ///
    /// # Errors
    ///
    /// [`DbError::SessionClosed`]; broker argument errors.
    pub fn register(&self, name: &str) -> Result<(), DbError> {
        self.ensure_open()?;
        self.broker.register(self.backend, name)?;
        Ok(())
    }

    /// Removes this backend's subscription to `name` and its undelivered
    /// signal for that name. No-op if absent.
    ///
    /// # Errors
    ///
    /// [`DbError::SessionClosed`]; broker argument errors.
    pub fn remove(&self, name: &str) -> Result<(), DbError> {
        self.ensure_open()?;
        self.broker.remove(self.backend, name)?;
        Ok(())
    }

    /// Removes all of this backend's subscriptions and pending signals.
    ///
    /// # Errors
    ///
    /// [`DbError::SessionClosed`].
    pub fn remove_all(&self) -> Result<(), DbError> {
        self.ensure_open()?;
        self.broker.remove_all(self.backend);
        Ok(())
    }

    // --- transactions --------------------------------------------------------

    /// Opens a transaction on this session.
    ///
    /// # Errors
    ///
    /// [`DbError::TransactionActive`] if one is already open;
    /// [`DbError::SessionClosed`].
    pub fn begin(&mut self) -> Result<TxId, DbError> {
        self.ensure_open()?;
        if self.current_tx.is_some() {
            return Err(DbError::TransactionActive);
        }
        let tx = self.alloc_tx();
        self.current_tx = Some(tx);
        tracing::trace!(backend = %self.backend, %tx, "transaction begun");
        Ok(tx)
    }

    /// Commits the open transaction, fanning out its deferred signals.
    ///
    /// # Errors
    ///
    /// [`DbError::NoActiveTransaction`] without `begin`;
    /// [`DbError::SessionClosed`].
    pub fn commit(&mut self) -> Result<(), DbError> {
        self.ensure_open()?;
        let tx = self.current_tx.take().ok_or(DbError::NoActiveTransaction)?;
        self.broker.on_commit(tx);
        Ok(())
    }

    /// Rolls back the open transaction, discarding its deferred signals.
    ///
    /// # Errors
    ///
    /// [`DbError::NoActiveTransaction`] without `begin`;
    /// [`DbError::SessionClosed`].
    pub fn rollback(&mut self) -> Result<(), DbError> {
        self.ensure_open()?;
        let tx = self.current_tx.take().ok_or(DbError::NoActiveTransaction)?;
        self.broker.on_rollback(tx);
        Ok(())
    }

    // --- signaling -----------------------------------------------------------

    /// Raises a signal on `name` with `message`.
    ///
    /// Inside an open transaction the signal is deferred until `commit`.
    /// Outside one it is wrapped as a single-statement transaction and
    /// becomes visible before this call returns.
    ///
    /// # Errors
    ///
    /// [`DbError::SessionClosed`]; broker argument errors.
    pub fn signal(&mut self, name: &str, message: &str) -> Result<(), DbError> {
        self.ensure_open()?;
        match self.current_tx {
            Some(tx) => {
                self.broker.signal(tx, self.backend, name, message)?;
            }
            None => {
                let tx = self.alloc_tx();
                self.broker.signal(tx, self.backend, name, message)?;
                self.broker.on_commit(tx);
            }
        }
        Ok(())
    }

    // --- waits -----------------------------------------------------------------

    /// Blocks until a signal on `name` is delivered to this backend, or the
    /// timeout elapses.
    ///
    /// `Some(Duration::ZERO)` is a single non-blocking check; `None` waits
    /// indefinitely, bounded by [`MAX_WAIT`](herald_core::MAX_WAIT).
    ///
    /// # Errors
    ///
    /// [`DbError::SessionClosed`]; broker argument/session errors.
    pub fn wait_one(&self, name: &str, timeout: Option<Duration>) -> Result<WaitOutcome, DbError> {
        self.ensure_open()?;
        Ok(self.broker.wait_one(self.backend, name, timeout)?)
    }

    /// Blocks until a signal on any name this backend is registered for is
    /// delivered, or the timeout elapses. Timeout semantics match
    /// [`wait_one`](Self::wait_one).
    ///
    /// # Errors
    ///
    /// [`DbError::SessionClosed`]; broker session errors.
    pub fn wait_any(&self, timeout: Option<Duration>) -> Result<WaitOutcome, DbError> {
        self.ensure_open()?;
        Ok(self.broker.wait_any(self.backend, timeout)?)
    }

    // --- lifecycle ---------------------------------------------------------------

    /// Closes the session: rolls back an open transaction and fires the
    /// session-end hook. Idempotent; also runs on `Drop`.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        if let Some(tx) = self.current_tx.take() {
            self.broker.on_rollback(tx);
        }
        self.broker.on_session_end(self.backend);
        self.open = false;
    }

    fn ensure_open(&self) -> Result<(), DbError> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::SessionClosed)
        }
    }

    fn alloc_tx(&self) -> TxId {
        TxId(self.tx_ids.fetch_add(1, Ordering::Relaxed))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! The `AlertDb` facade: one broker per server process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use herald_core::time::Clock;
use herald_core::{AlertBroker, BackendId, BrokerConfig};

use crate::config::AlertDbConfig;
use crate::error::DbError;
use crate::session::Session;

/// Process-wide alert facility.
///
/// Owns the [`AlertBroker`] and allocates backend and transaction IDs.
/// Cheap to share behind an `Arc`; each connecting backend gets its own
/// [`Session`].
#[derive(Debug)]
pub struct AlertDb {
    broker: Arc<AlertBroker>,
    next_backend: AtomicU64,
    next_tx: Arc<AtomicU64>,
}

impl AlertDb {
    /// Creates a facility on the system clock.
    #[must_use]
    pub fn new(config: AlertDbConfig) -> Self {
        Self::from_broker(AlertBroker::new(broker_config(&config)))
    }

    /// Creates a facility on an injected clock (deterministic tests).
    #[must_use]
    pub fn with_clock(config: AlertDbConfig, clock: Arc<dyn Clock>) -> Self {
        Self::from_broker(AlertBroker::with_clock(broker_config(&config), clock))
    }

    fn from_broker(broker: AlertBroker) -> Self {
        Self {
            broker: Arc::new(broker),
            next_backend: AtomicU64::new(1),
            next_tx: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Opens a session for a newly connected backend.
    #[must_use]
    pub fn connect(&self) -> Session {
        let backend = BackendId(self.next_backend.fetch_add(1, Ordering::Relaxed));
        self.broker.attach(backend);
        tracing::debug!(%backend, "session connected");
        Session::new(backend, Arc::clone(&self.broker), Arc::clone(&self.next_tx))
    }

    /// Sets the process-wide sensitivity window, in seconds.
    ///
    /// Takes float seconds because that is the unit the SQL-level
    /// `set_defaults` call carries. Applies to future commits only.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidArgument`] if `sensitivity_secs` is negative or not
    /// finite.
    pub fn set_defaults(&self, sensitivity_secs: f64) -> Result<(), DbError> {
        if !sensitivity_secs.is_finite() || sensitivity_secs < 0.0 {
            return Err(DbError::InvalidArgument(format!(
                "sensitivity must be a non-negative number of seconds, got {sensitivity_secs}"
            )));
        }
        self.broker
            .set_sensitivity(Duration::from_secs_f64(sensitivity_secs));
        Ok(())
    }

    /// The underlying broker, for the host's commit/rollback hook wiring.
    #[must_use]
    pub fn broker(&self) -> &Arc<AlertBroker> {
        &self.broker
    }
}

fn broker_config(config: &AlertDbConfig) -> BrokerConfig {
    BrokerConfig {
        sensitivity: config.sensitivity,
        deliver_to_sender: config.deliver_to_sender,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

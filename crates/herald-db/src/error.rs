//! Error types for the Herald facade.

/// Errors from facade operations.
///
/// A wait timeout is not an error; it is reported as
/// [`WaitOutcome::TimedOut`](herald_core::WaitOutcome::TimedOut).
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Broker engine error
    #[error("Broker error: {0}")]
    Broker(#[from] herald_core::broker::BrokerError),

    /// Caller-supplied argument was rejected
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `begin` called while a transaction is already open
    #[error("A transaction is already active on this session")]
    TransactionActive,

    /// `commit`/`rollback` called with no open transaction
    #[error("No active transaction on this session")]
    NoActiveTransaction,

    /// Operation on a session that was already closed
    #[error("Session is closed")]
    SessionClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::broker::BrokerError;

    #[test]
    fn test_broker_error_converts() {
        let err: DbError = BrokerError::EmptyAlertName.into();
        assert!(matches!(err, DbError::Broker(BrokerError::EmptyAlertName)));
        assert_eq!(
            err.to_string(),
            "Broker error: alert name must not be empty"
        );
    }
}

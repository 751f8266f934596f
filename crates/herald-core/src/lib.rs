//! # Herald Core
//!
//! The transactional alert broker engine for Herald, implementing named-event
//! publish/subscribe with commit-deferred delivery.
//!
//! This crate provides:
//! - **Broker**: subscription registry, pending-signal mailboxes, deferred
//!   signal queues, and the blocking wait engine
//! - **Sensitivity filter**: debounce policy that collapses signal storms on
//!   a hot alert name
//! - **Time**: injectable monotonic clock so timeout and debounce logic can
//!   be tested without sleeping
//!
//! ## Design Principles
//!
//! 1. **Waiters only see committed facts** — signals raised inside a
//!    transaction are buffered and fanned out at commit; a rollback leaves no
//!    observable trace
//! 2. **Broadcast, not queue** — each subscriber holds at most one undelivered
//!    signal per alert name; a newer signal overwrites an older one
//! 3. **One lock, never held while blocked** — all registry and mailbox
//!    mutations share a broker-wide mutex; waiting backends release it while
//!    parked on the condvar
//!
//! ## Example
//!
//! ```rust
//! use herald_core::{AlertBroker, BackendId, BrokerConfig, TxId, WaitOutcome};
//! use std::time::Duration;
//!
//! let broker = AlertBroker::new(BrokerConfig::default());
//! let (a, b) = (BackendId(1), BackendId(2));
//! broker.attach(a);
//! broker.attach(b);
//!
//! broker.register(a, "ORD_READY").unwrap();
//!
//! let tx = TxId(1);
//! broker.signal(tx, b, "ORD_READY", "order 42").unwrap();
//! broker.on_commit(tx);
//!
//! let outcome = broker.wait_one(a, "ORD_READY", Some(Duration::ZERO)).unwrap();
//! assert_eq!(
//!     outcome,
//!     WaitOutcome::Delivered {
//!         name: "ORD_READY".into(),
//!         message: "order 42".into(),
//!     }
//! );
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod broker;
pub mod time;

// Re-export key types
pub use broker::{
    AlertBroker, BackendId, BrokerConfig, BrokerError, TxId, WaitOutcome, DEFAULT_SENSITIVITY,
    MAX_MESSAGE_LEN, MAX_WAIT,
};
pub use time::{Clock, ManualClock, SystemClock};

/// Result type for herald-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for herald-core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Broker-related errors
    #[error("Broker error: {0}")]
    Broker(#[from] broker::BrokerError),
}

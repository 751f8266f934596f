//! # Herald DB
//!
//! Embedder-facing facade for the Herald transactional alert broker.
//!
//! [`AlertDb`] owns one [`herald_core::AlertBroker`] per server process and
//! hands out [`Session`] handles, one per database backend. A session exposes
//! the operation surface the host's compatibility layer maps SQL calls onto:
//!
//! | Operation | Session method | Notes |
//! |---|---|---|
//! | register | [`Session::register`] | idempotent |
//! | remove | [`Session::remove`] | idempotent |
//! | removeall | [`Session::remove_all`] | also clears pending signals |
//! | set_defaults | [`AlertDb::set_defaults`] | process-wide sensitivity |
//! | signal | [`Session::signal`] | deferred to commit |
//! | waitone | [`Session::wait_one`] | blocking |
//! | waitany | [`Session::wait_any`] | blocking |
//!
//! Transaction scoping comes from [`Session::begin`] / [`Session::commit`] /
//! [`Session::rollback`], which drive the broker's commit and rollback hooks
//! exactly once per outcome. A `signal` issued outside any transaction is
//! auto-wrapped as a single-statement transaction that commits immediately.
//! Dropping a session fires the session-end hook (rolling back an open
//! transaction first), so a disconnecting backend never leaks subscriptions
//! or strands a waiter.
//!
//! ## Example
//!
//! ```rust
//! use herald_db::{AlertDb, AlertDbConfig};
//! use herald_core::WaitOutcome;
//! use std::time::Duration;
//!
//! let db = AlertDb::new(AlertDbConfig::default());
//! let listener = db.connect();
//! let mut signaler = db.connect();
//!
//! listener.register("ORD_READY").unwrap();
//! signaler.signal("ORD_READY", "order 42").unwrap(); // auto-commits
//!
//! let outcome = listener
//!     .wait_one("ORD_READY", Some(Duration::from_secs(5)))
//!     .unwrap();
//! assert!(outcome.is_delivered());
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod config;
mod db;
mod error;
mod session;

pub use config::AlertDbConfig;
pub use db::AlertDb;
pub use error::DbError;
pub use session::Session;

// Re-exported so embedders don't need a direct herald-core dependency for
// the common types.
pub use herald_core::{BackendId, TxId, WaitOutcome, DEFAULT_SENSITIVITY, MAX_MESSAGE_LEN, MAX_WAIT};

//! # GW-01 Transaction Ledger
//!
//! Durable, idempotent persistence for negotiation flows.
//!
//! The ledger is the sole shared mutable store of the engine. Every write
//! is an upsert keyed by the record's id, so racing writers converge on one
//! row instead of duplicating. Reads are point lookups plus bounded prefix
//! scans (pending flows for the reaper, unprocessed workloads for the
//! poller, zone registry for name resolution).
//!
//! Storage is abstracted behind the [`DocumentStore`] port; the in-memory
//! adapter backs unit/integration tests and the file-backed adapter is the
//! production default.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod errors;
pub mod ports;
pub mod retry;
pub mod service;

pub use errors::StoreError;
pub use ports::{DocumentStore, FileBackedStore, InMemoryStore};
pub use retry::{Backoff, RetryPolicy};
pub use service::LedgerService;

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM: &str = "gw-01";

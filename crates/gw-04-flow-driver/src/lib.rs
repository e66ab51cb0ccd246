//! # GW-04 Flow Driver
//!
//! The negotiation state machine. Drives the discover → select → init →
//! confirm chain, resumes flows from asynchronous callbacks, and reaps
//! flows whose counterparty never called back.
//!
//! Ordering guarantee: all work for one transaction id runs under a keyed
//! async mutex, so a continuation and a late callback can never
//! double-advance one flow. Distinct transaction ids run fully parallel.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod driver;
pub mod locks;

pub use driver::{CandidatePolicy, FlowDriver, FlowOutcome};
pub use locks::TxnLocks;

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM: &str = "gw-04";

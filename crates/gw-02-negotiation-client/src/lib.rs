//! # GW-02 Negotiation Client
//!
//! Outbound half of the protocol: builds the envelope, posts one action to
//! the counterparty, classifies the reply as synchronous / pending / error,
//! and persists a ledger step row for every attempt **before** the caller
//! observes the result.
//!
//! Retry/backoff for the protocol call itself does not live here; a failed
//! call is classified and surfaced, and the flow driver decides what the
//! failure means for the flow.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod http;
pub mod outcome;
pub mod ports;
pub mod service;
pub mod testing;

pub use http::HttpTransport;
pub use outcome::{classify, NegotiationOutcome};
pub use ports::{ProtocolTransport, TransportError, TransportReply};
pub use service::{Dispatch, NegotiationClient};

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM: &str = "gw-02";

//! # GW-06 Callback Gateway
//!
//! Inbound half of the protocol: the HTTP surface the counterparty calls
//! back into. Each `on_<action>` handler acknowledges immediately and hands
//! the payload to the flow driver on a spawned task, so a slow continuation
//! never stalls the counterparty's delivery loop.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod router;
pub mod server;

pub use router::{build_router, GatewayState};
pub use server::serve;

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM: &str = "gw-06";

//! # Shared Types Crate
//!
//! This crate contains all domain entities, the negotiation protocol
//! envelope, and the cross-subsystem error taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Envelope Integrity**: Every outbound protocol call and inbound
//!   callback carries a `NegotiationContext`; the transaction id in the
//!   envelope is the sole correlation key for a flow.
//! - **Monotonic State**: `FlowState` transitions never move backward and
//!   terminal states are sticky.

pub mod entities;
pub mod envelope;
pub mod errors;

pub use entities::*;
pub use envelope::{Action, ContextBuilder, NegotiationContext, ProviderRef};
pub use errors::*;

//! # Engine Runtime
//!
//! Configuration, dependency wiring, and task supervision for the
//! negotiation engine binary.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod wiring;

pub use config::EngineConfig;
pub use wiring::Engine;

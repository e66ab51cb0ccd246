//! Cross-subsystem integration tests.

pub mod fixtures;

mod flows;
mod gateway;
mod ranking;

//! # GridWeave Telemetry
//!
//! Structured logging for the negotiation engine.
//!
//! Every subsystem logs through `tracing` with a `subsystem` prefix
//! (`[gw-01]` … `[gw-06]`, `[runtime]`) and, for anything touching a flow,
//! a `transaction_id` field so one negotiation can be followed across
//! client, driver, gateway, and processor.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gridweave_telemetry::{TelemetryConfig, init_telemetry};
//!
//! fn main() {
//!     let config = TelemetryConfig::from_env();
//!     init_telemetry(&config).expect("failed to init telemetry");
//!     // traces and logs are now being collected
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GW_LOG_LEVEL` | `info` | Log level filter |
//! | `GW_LOG_JSON` | `false` | Emit JSON log lines |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::init_tracing;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize the telemetry stack for the process.
///
/// Safe to call once per process; a second call reports `SubscriberInit`
/// because the global subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_setup::init_tracing(config)
}

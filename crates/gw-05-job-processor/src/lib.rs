//! # GW-05 Job Processor
//!
//! Poll-driven batch processor. On a fixed interval it picks up submitted
//! workloads, drives a full negotiation flow for each, ranks the resulting
//! catalog, asks the summarizer for a short placement summary (best
//! effort), and persists the outcome. One workload's failure never stops
//! the batch.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod ports;
pub mod service;
pub mod summarizer;

pub use config::ProcessorConfig;
pub use ports::{Summarizer, SummarizerError, SUMMARY_PLACEHOLDER};
pub use service::JobProcessor;
pub use summarizer::HttpSummarizer;

/// Subsystem identifier used in log prefixes.
pub const SUBSYSTEM: &str = "gw-05";

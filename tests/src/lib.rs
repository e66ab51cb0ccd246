//! # GridWeave Test Suite
//!
//! Unified test crate for cross-subsystem behavior:
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs   # Shared engine/fixture builders
//!     ├── flows.rs      # Flow chaining, halting, races, reaping
//!     ├── ranking.rs    # End-to-end ranking and padding
//!     └── gateway.rs    # Inbound callback surface
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gw-tests
//! cargo test -p gw-tests integration::flows::
//! ```

#![allow(dead_code)]

pub mod integration;
